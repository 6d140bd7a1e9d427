//! Script builders for in-page evaluation.
//!
//! Every operation against the document goes through `Runtime.evaluate`
//! with one of these IIFE snippets. Matched elements are tagged with a
//! `data-jobcafe-handle` token and addressed through that token selector
//! afterwards, so a handle returned by one query stays valid across later
//! queries. User-supplied strings are embedded as JSON literals, never
//! concatenated raw.

use jobcafe_core_types::Locator;

/// Attribute used to tag located elements.
pub const HANDLE_ATTR: &str = "data-jobcafe-handle";

fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap()
}

/// Locate every node matching `locator`, tag untagged matches with fresh
/// tokens derived from `prefix`, and return the token list in document
/// order. Already-tagged nodes keep their token.
pub fn find_all(locator: &Locator, prefix: &str) -> String {
    let collector = match locator {
        Locator::XPath(expr) => format!(
            r#"const snapshot = document.evaluate({expr}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            for (let i = 0; i < snapshot.snapshotLength; i++) {{ nodes.push(snapshot.snapshotItem(i)); }}"#,
            expr = js_str(expr),
        ),
        Locator::Css(selector) => format!(
            "nodes = Array.from(document.querySelectorAll({selector}));",
            selector = js_str(selector),
        ),
        Locator::Text { content, exact } => format!(
            r#"const target = {content};
            const exact = {exact};
            const lower = (input) => (input || '').trim().toLowerCase();
            for (const el of document.querySelectorAll('body *')) {{
                const value = lower(el.innerText || el.textContent || '');
                if (!value) {{ continue; }}
                if (exact ? value === lower(target) : value.includes(lower(target))) {{
                    nodes.push(el);
                }}
            }}"#,
            content = js_str(content),
            exact = if *exact { "true" } else { "false" },
        ),
    };

    format!(
        r#"(() => {{
            const attr = {attr};
            const prefix = {prefix};
            let nodes = [];
            try {{
                {collector}
            }} catch (err) {{
                return {{ status: 'error', message: String(err) }};
            }}
            const tokens = [];
            let seq = 0;
            for (const node of nodes) {{
                if (!(node instanceof Element)) {{ continue; }}
                let token = node.getAttribute(attr);
                if (!token) {{
                    token = prefix + '-' + (seq++);
                    node.setAttribute(attr, token);
                }}
                tokens.push(token);
            }}
            return {{ status: 'ok', tokens }};
        }})()"#,
        attr = js_str(HANDLE_ATTR),
        prefix = js_str(prefix),
        collector = collector,
    )
}

fn with_element(selector: &str, body: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) {{ return {{ status: 'missing' }}; }}
            {body}
        }})()"#,
        selector = js_str(selector),
        body = body,
    )
}

pub fn is_visible(selector: &str) -> String {
    with_element(
        selector,
        r#"const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            const visible = style.visibility !== 'hidden' && style.display !== 'none'
                && (rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0);
            return { status: 'ok', value: visible };"#,
    )
}

pub fn is_clickable(selector: &str) -> String {
    with_element(
        selector,
        r#"const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            const visible = style.visibility !== 'hidden' && style.display !== 'none'
                && (rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0);
            const interactable = !el.disabled && style.pointerEvents !== 'none';
            return { status: 'ok', value: visible && interactable };"#,
    )
}

pub fn text(selector: &str) -> String {
    with_element(
        selector,
        "return { status: 'ok', value: (el.innerText || el.textContent || '').trim() };",
    )
}

pub fn attribute(selector: &str, name: &str) -> String {
    let body = format!(
        "return {{ status: 'ok', value: el.getAttribute({name}) }};",
        name = js_str(name),
    );
    with_element(selector, &body)
}

pub fn value(selector: &str) -> String {
    with_element(
        selector,
        r#"const value = 'value' in el ? el.value : el.getAttribute('value');
            return { status: 'ok', value: value == null ? '' : String(value) };"#,
    )
}

pub fn click(selector: &str) -> String {
    with_element(
        selector,
        r#"el.scrollIntoView({ block: 'center', inline: 'center' });
            el.click();
            return { status: 'ok' };"#,
    )
}

fn set_value_body(next_value_expr: &str) -> String {
    format!(
        r#"el.focus();
            const proto = el instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype
                : HTMLInputElement.prototype;
            const desc = Object.getOwnPropertyDescriptor(proto, 'value');
            const next = {next};
            if (desc && desc.set) {{ desc.set.call(el, next); }} else {{ el.value = next; }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ status: 'ok' }};"#,
        next = next_value_expr,
    )
}

/// Append keystrokes to the field. The native value setter plus an
/// `input` event is what frameworks listening on controlled inputs need.
pub fn send_input(selector: &str, input: &str) -> String {
    let body = set_value_body(&format!("(el.value || '') + {}", js_str(input)));
    with_element(selector, &body)
}

pub fn clear(selector: &str) -> String {
    let body = set_value_body("''");
    with_element(selector, &body)
}

pub fn ready_state() -> String {
    "document.readyState".to_string()
}
