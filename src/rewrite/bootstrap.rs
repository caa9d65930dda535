//! Client-side navigation interception script.
//!
//! Injected into every rewritten document. It carries the proxy origin and the
//! page's original URL, rebases path-absolute `fetch` calls onto the original
//! site, and sends link clicks back through `/proxy` when they stay on the
//! original site or on the proxy's own origin.

/// Attribute marking the injected element so a second rewrite can replace it.
pub const BOOTSTRAP_MARKER: &str = "data-relay-bootstrap";

const TEMPLATE: &str = r#"(function () {
  var proxyBase = __PROXY_BASE__;
  var originalUrl = __ORIGINAL_URL__;
  window.proxyBase = proxyBase;
  window.originalUrl = originalUrl;
  var pageDir = originalUrl.replace(/\/[^\/]*$/, '');
  var originalOrigin = new URL(originalUrl).origin;
  var nativeFetch = window.fetch;
  if (nativeFetch) {
    window.fetch = function (input, init) {
      if (typeof input === 'string' && input.charAt(0) === '/' && input.charAt(1) !== '/') {
        input = pageDir + input;
      }
      return nativeFetch.call(this, input, init);
    };
  }
  document.addEventListener('click', function (e) {
    var link = e.target && e.target.closest ? e.target.closest('a[href]') : null;
    if (!link) return;
    var raw = link.getAttribute('href');
    if (!raw || raw.charAt(0) === '#') return;
    var target;
    try { target = new URL(raw, originalUrl); } catch (err) { return; }
    if (raw.charAt(0) === '/' || link.origin === window.location.origin || target.origin === originalOrigin) {
      e.preventDefault();
      window.location.href = proxyBase + '/proxy?url=' + encodeURIComponent(target.href);
    }
  });
})();"#;

/// Render the `<script>` element for one document.
pub fn bootstrap_script(proxy_origin: &str, original_url: &str) -> String {
    let body = TEMPLATE
        .replace("__PROXY_BASE__", &js_string(proxy_origin))
        .replace("__ORIGINAL_URL__", &js_string(original_url));
    format!("<script {}>{}</script>", BOOTSTRAP_MARKER, body)
}

/// JSON string literal that cannot terminate the surrounding script element.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}
