//! Embedded Node helper script for the rendering session.
//!
//! The script reads one JSON request from stdin, drives a Puppeteer
//! headless-shell session, and writes one JSON outcome document to stdout.
//! Page console output is collected and attached to failure payloads only;
//! the browser is closed in a `finally` block on every path.

/// stdin: `{ html_path, source, theme, browser_exe?, no_sandbox, mermaid_js? }`
/// stdout: `{ ok: true, png_base64, width, height }`
///     or: `{ ok: false, stage, error, logs }`
pub(crate) const RENDER_SCRIPT: &str = r#"
const fs = require('fs');
const path = require('path');
const url = require('url');
const { createRequire } = require('module');
const requireFromCwd = createRequire(path.join(process.cwd(), 'package.json'));

const input = JSON.parse(fs.readFileSync(0, 'utf8'));

class StageError extends Error {
  constructor(stage, cause) {
    super(String((cause && cause.message) || cause));
    this.stage = stage;
  }
}

function loadPuppeteer() {
  try {
    return requireFromCwd('puppeteer');
  } catch (e) {
    try {
      return requireFromCwd('puppeteer-core');
    } catch (e2) {
      throw new StageError('setup', 'puppeteer is not installed under ' + process.cwd());
    }
  }
}

function resolveMermaid() {
  if (input.mermaid_js) {
    return input.mermaid_js;
  }
  try {
    return requireFromCwd.resolve('mermaid/dist/mermaid.js');
  } catch (e) {
    throw new StageError('setup', 'mermaid bundle not found under ' + process.cwd());
  }
}

(async () => {
  const logs = [];
  let browser = null;
  let out;
  try {
    const puppeteer = loadPuppeteer();
    const mermaidJs = resolveMermaid();

    const launchOpts = { headless: 'shell', args: [] };
    if (input.no_sandbox) {
      launchOpts.args.push('--no-sandbox', '--disable-setuid-sandbox');
    }
    if (input.browser_exe) {
      launchOpts.executablePath = input.browser_exe;
    }
    try {
      browser = await puppeteer.launch(launchOpts);
    } catch (e) {
      throw new StageError('launch', e);
    }

    const page = await browser.newPage();
    page.on('console', (msg) => logs.push(msg.text()));
    page.on('pageerror', (err) => logs.push(String(err)));

    try {
      await page.goto(url.pathToFileURL(input.html_path).href);
      await page.addScriptTag({ path: mermaidJs });
    } catch (e) {
      throw new StageError('inject', e);
    }

    let box;
    try {
      box = await page.evaluate(async ({ source, theme }) => {
        const mermaid = globalThis.mermaid;
        if (!mermaid) {
          throw new Error('mermaid global not found after script injection');
        }
        mermaid.initialize({ startOnLoad: false, theme });
        const container = document.getElementById('container');
        const { svg } = await mermaid.render('mmdshot-svg', source, container);
        container.innerHTML = svg;
        const el = container.querySelector('svg');
        const r = el.getBoundingClientRect();
        return { width: r.width, height: r.height };
      }, { source: input.source, theme: input.theme });
    } catch (e) {
      throw new StageError('render', e);
    }

    if (!box || !(box.width > 0) || !(box.height > 0)) {
      throw new StageError('capture', 'rendered diagram has an empty bounding box');
    }
    const el = await page.$('#container svg');
    if (!el) {
      throw new StageError('capture', 'rendered svg element not found');
    }
    const png = await el.screenshot({ encoding: 'base64' });

    out = {
      ok: true,
      png_base64: png,
      width: Math.round(box.width),
      height: Math.round(box.height),
    };
  } catch (e) {
    out = {
      ok: false,
      stage: e instanceof StageError ? e.stage : 'capture',
      error: String((e && e.message) || e),
      logs,
    };
  } finally {
    if (browser) {
      try { await browser.close(); } catch (e) {}
    }
  }
  console.log(JSON.stringify(out));
})();
"#;
