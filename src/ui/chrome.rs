//! Chrome page served to the chrome webview.
//!
//! It owns the tab store: every change is posted as a `tabs_state_changed`
//! snapshot, and the area left for web content is measured and posted as
//! `set_content_bounds`. Core events arrive through `__tabshell.dispatch`.

pub const CHROME_SCHEME: &str = "tabshell";

#[cfg(target_os = "windows")]
pub const CHROME_URL: &str = "http://tabshell.localhost/";
#[cfg(not(target_os = "windows"))]
pub const CHROME_URL: &str = "tabshell://localhost/";

pub const CHROME_HTML: &str = r#"<!DOCTYPE html>
<html><head><meta charset="UTF-8"><style>
body{margin:0;font:13px sans-serif;display:flex;flex-direction:column;height:100vh}
#strip{display:flex;gap:4px;padding:4px}
.tab{padding:4px 8px;border:1px solid #999;cursor:default;max-width:180px;overflow:hidden;white-space:nowrap}
.tab.active{font-weight:bold}.tab.discarded{opacity:.5}
#bar{display:flex;gap:4px;padding:4px}#address{flex:1}
#content{flex:1}#menu{position:fixed;display:none;background:#fff;border:1px solid #999}
#menu div{padding:4px 12px}#menu hr{margin:2px 0}
</style></head><body>
<div id="strip"></div>
<div id="bar"><button id="back">&lt;</button><button id="fwd">&gt;</button><button id="reload">R</button>
<input id="address"><button id="newtab">+</button><button id="pip">PiP</button></div>
<div id="content"></div><div id="menu"></div>
<script>
(() => {
  const post = (m) => window.ipc.postMessage(JSON.stringify(m));
  let tabs = [], activeTabId = null, seq = 0;
  const $ = (id) => document.getElementById(id);
  const snapshot = () => post({ cmd: "tabs_state_changed", tabs, activeTabId });
  const render = () => {
    $("strip").innerHTML = "";
    tabs.forEach((t) => {
      const el = document.createElement("div");
      el.className = "tab" + (t.id === activeTabId ? " active" : "") + (t.isDiscarded ? " discarded" : "");
      el.textContent = t.title || t.url || "New Tab";
      el.onclick = () => { activeTabId = t.id; render(); snapshot(); };
      el.ondblclick = () => closeTab(t.id);
      $("strip").appendChild(el);
    });
    const active = tabs.find((t) => t.id === activeTabId);
    if (active && document.activeElement !== $("address")) $("address").value = active.url;
  };
  const addTab = (url, background) => {
    const tab = { id: "tab-" + Date.now() + "-" + (seq++), url: url || "", title: "", isMuted: false };
    tabs.push(tab);
    if (!background || !activeTabId) activeTabId = tab.id;
    render(); snapshot();
  };
  const closeTab = (id) => {
    const i = tabs.findIndex((t) => t.id === id);
    if (i < 0) return;
    tabs.splice(i, 1);
    if (activeTabId === id) activeTabId = tabs.length ? tabs[Math.max(0, i - 1)].id : null;
    if (!tabs.length) { post({ cmd: "window_close" }); return; }
    render(); snapshot();
  };
  const bounds = () => {
    const r = $("content").getBoundingClientRect();
    post({ cmd: "set_content_bounds", x: r.x, y: r.y, width: r.width, height: r.height });
  };
  const showMenu = (tabId, items) => {
    const menu = $("menu");
    menu.innerHTML = "";
    items.forEach((item) => {
      if (item.type === "separator") { menu.appendChild(document.createElement("hr")); return; }
      const el = document.createElement("div");
      el.textContent = item.label;
      if (item.enabled) el.onclick = () => { hideMenu(); post({ cmd: "context_action", tabId, action: item.action }); };
      else el.style.opacity = ".5";
      menu.appendChild(el);
    });
    const r = $("content").getBoundingClientRect();
    menu.style.left = (r.x + 16) + "px"; menu.style.top = (r.y + 16) + "px";
    menu.style.display = "block";
    post({ cmd: "set_hidden", hidden: true });
  };
  const hideMenu = () => {
    if ($("menu").style.display !== "block") return;
    $("menu").style.display = "none";
    post({ cmd: "set_hidden", hidden: false });
  };
  const handlers = {
    webState: (s) => {
      const t = tabs.find((t) => t.id === s.tabId);
      if (!t) return;
      Object.assign(t, { url: s.url, title: s.title, isMuted: s.isMuted });
      render();
    },
    tabDiscarded: (p) => {
      const t = tabs.find((t) => t.id === p.tabId);
      if (t) { t.isDiscarded = p.discarded; render(); }
    },
    openUrlInNewTab: (p) => addTab(p.url, p.background),
    openUrlInNewWindow: (p) => addTab(p.url, false),
    copyToClipboard: (p) => navigator.clipboard && navigator.clipboard.writeText(p.text),
    findResult: (r) => console.log("find", r),
    pictureInPicture: (r) => { if (!r.ok) console.warn(r.message); },
    windowState: (s) => console.log("window", s),
    downloadUpdated: (d) => console.log("download", d),
  };
  window.__tabshell = {
    dispatch: (event) => { const h = handlers[event.channel]; if (h) h(event.payload); },
    reply: (requestId, value) => console.log("reply", requestId, value),
    showContextMenu: showMenu,
  };
  $("back").onclick = () => post({ cmd: "back" });
  $("fwd").onclick = () => post({ cmd: "forward" });
  $("reload").onclick = () => post({ cmd: "reload" });
  $("pip").onclick = () => post({ cmd: "toggle_pip" });
  $("newtab").onclick = () => addTab("", false);
  $("address").onkeydown = (e) => {
    if (e.key !== "Enter") return;
    const t = tabs.find((t) => t.id === activeTabId);
    if (!t) return addTab(e.target.value, false);
    t.url = e.target.value; snapshot(); post({ cmd: "focus_active_webview" });
  };
  document.addEventListener("click", hideMenu);
  document.addEventListener("keydown", (e) => {
    if ((e.ctrlKey || e.metaKey) && e.key === "f") {
      const q = prompt("Find");
      if (q) post({ cmd: "find_in_page", query: q }); else post({ cmd: "stop_find" });
    }
    if (e.key === "Escape") { hideMenu(); post({ cmd: "stop_find" }); }
    if (e.altKey && !e.ctrlKey && !e.metaKey && (/^Digit[1-3]$/.test(e.code) || ["1", "2", "3"].includes(e.key))) {
      e.preventDefault();
      post({ cmd: "key_input", kind: "keyDown", key: e.key, code: e.code,
        alt: e.altKey, control: e.ctrlKey, meta: e.metaKey, shift: e.shiftKey });
    }
  });
  new ResizeObserver(bounds).observe($("content"));
  addTab("", false);
  bounds();
})();
</script></body></html>"#;
