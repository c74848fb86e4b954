//! Typed page scripts
//!
//! Every script the automation injects is a [`Script`] value carrying its
//! parameters. Rendering to JavaScript happens in one place, and every
//! caller-supplied string goes through [`js_string`] on the way in.

use serde_json::Value;

/// Render a string as a JavaScript string literal
pub fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Render a list of strings as a JavaScript array literal
pub fn js_array(items: &[String]) -> String {
    Value::from(items.to_vec()).to_string()
}

/// Looks up an element, treating selectors the engine can't parse as absent
const QUERY_HELPER: &str = r#"const $q = (s) => { try { return document.querySelector(s); } catch (_) { return null; } };"#;

/// Resolves the un-overridden `value` setter for a text control
const NATIVE_SETTER_HELPER: &str = r#"const $setter = (el) => {
    const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
        : el instanceof HTMLInputElement ? HTMLInputElement.prototype : null;
    const desc = proto && Object.getOwnPropertyDescriptor(proto, 'value');
    return desc && desc.set ? desc.set : null;
};"#;

/// Pins `target`/`currentTarget` on a synthetic event
const PIN_TARGET_HELPER: &str = r#"const $pin = (ev, el) => {
    Object.defineProperty(ev, 'target', { value: el, enumerable: true });
    Object.defineProperty(ev, 'currentTarget', { value: el, enumerable: true });
    return ev;
};"#;

/// Clears the control's disabled state
const FORCE_ENABLE_HELPER: &str = r#"const $enable = (el) => { el.disabled = false; el.removeAttribute('disabled'); el.removeAttribute('aria-disabled'); };"#;

/// A script to evaluate in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// `true` if the selector resolves
    ElementExists { selector: String },
    /// Clicks an enabled element; `false` if absent or disabled
    Click { selector: String },
    /// Current value and placeholder of a text control
    InspectField { selector: String },
    /// Focus, then empty the field through the native setter
    FocusAndClear { selector: String },
    /// Write the text through the native setter and announce it
    SetValue { selector: String, text: String },
    /// change/blur/focusout, refocus, and one delayed input re-assertion
    TrailingEvents { selector: String, reassert_ms: u64 },
    /// Read back the field and compare against a prefix
    VerifyValue { selector: String, prefix: String },
    /// Actionability of the control
    ControlState { selector: String },
    /// Force-enable and call the control's click
    ForceClick { selector: String },
    /// Force-enable and click the inner glyph
    InnerElementClick { selector: String, inner: String },
    /// Force-enable and dispatch press/release/click at the center
    PointerSequence { selector: String },
    /// Submit the enclosing form, or dispatch submit on the control
    SubmitForm { selector: String },
    /// Observable signs the action was accepted
    SideEffect {
        selector: String,
        baseline_text: Option<String>,
        loading: Vec<String>,
        url_markers: Vec<String>,
    },
    /// Visible text fields and buttons, for diagnostics
    InspectPage,
}

impl Script {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Script::ElementExists { .. } => "element_exists",
            Script::Click { .. } => "click",
            Script::InspectField { .. } => "inspect_field",
            Script::FocusAndClear { .. } => "focus_and_clear",
            Script::SetValue { .. } => "set_value",
            Script::TrailingEvents { .. } => "trailing_events",
            Script::VerifyValue { .. } => "verify_value",
            Script::ControlState { .. } => "control_state",
            Script::ForceClick { .. } => "force_click",
            Script::InnerElementClick { .. } => "inner_element_click",
            Script::PointerSequence { .. } => "pointer_sequence",
            Script::SubmitForm { .. } => "submit_form",
            Script::SideEffect { .. } => "side_effect",
            Script::InspectPage => "inspect_page",
        }
    }

    /// JavaScript source, an immediately invoked function expression
    pub fn render(&self) -> String {
        let body = match self {
            Script::ElementExists { selector } => {
                format!("return $q({}) !== null;", js_string(selector))
            }

            Script::Click { selector } => format!(
                r#"const el = $q({sel});
    if (!el || el.disabled) return false;
    el.click();
    return true;"#,
                sel = js_string(selector)
            ),

            Script::InspectField { selector } => format!(
                r#"const el = $q({sel});
    if (!el) return {{ found: false }};
    return {{
        found: true,
        tag: el.tagName.toLowerCase(),
        value: el.value ?? '',
        placeholder: el.placeholder ?? ''
    }};"#,
                sel = js_string(selector)
            ),

            Script::FocusAndClear { selector } => format!(
                r#"{setter}
    const el = $q({sel});
    if (!el) return {{ ok: false, error: 'element not found' }};
    el.focus();
    const set = $setter(el);
    if (!set) return {{ ok: false, error: 'native value setter unavailable' }};
    set.call(el, '');
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    return {{ ok: true, value: el.value, length: el.value.length }};"#,
                setter = NATIVE_SETTER_HELPER,
                sel = js_string(selector)
            ),

            Script::SetValue { selector, text } => format!(
                r#"{setter}
    {pin}
    const el = $q({sel});
    if (!el) return {{ ok: false, error: 'element not found' }};
    const set = $setter(el);
    if (!set) return {{ ok: false, error: 'native value setter unavailable' }};
    set.call(el, {text});
    el.dispatchEvent($pin(new Event('input', {{ bubbles: true, cancelable: true }}), el));
    return {{ ok: true, value: el.value, length: el.value.length }};"#,
                setter = NATIVE_SETTER_HELPER,
                pin = PIN_TARGET_HELPER,
                sel = js_string(selector),
                text = js_string(text)
            ),

            Script::TrailingEvents {
                selector,
                reassert_ms,
            } => format!(
                r#"{pin}
    const el = $q({sel});
    if (!el) return false;
    for (const type of ['change', 'blur', 'focusout']) {{
        el.dispatchEvent($pin(new Event(type, {{ bubbles: true }}), el));
    }}
    el.focus();
    setTimeout(() => el.dispatchEvent($pin(new Event('input', {{ bubbles: true }}), el)), {delay});
    return true;"#,
                pin = PIN_TARGET_HELPER,
                sel = js_string(selector),
                delay = reassert_ms
            ),

            Script::VerifyValue { selector, prefix } => format!(
                r#"const el = $q({sel});
    if (!el) return {{ found: false }};
    const value = el.value ?? '';
    return {{
        found: true,
        value: value,
        length: value.length,
        matches: value.length > 0 && value.includes({prefix})
    }};"#,
                sel = js_string(selector),
                prefix = js_string(prefix)
            ),

            Script::ControlState { selector } => format!(
                r#"const el = $q({sel});
    if (!el) return {{ found: false }};
    const style = window.getComputedStyle(el);
    const form = el.closest('form');
    const disabled = !!el.disabled || el.getAttribute('aria-disabled') === 'true';
    const visible = el.offsetParent !== null && style.visibility !== 'hidden';
    return {{
        found: true,
        disabled: disabled,
        visible: visible,
        formValid: form ? form.checkValidity() : true,
        pointerEvents: style.pointerEvents,
        text: (el.textContent || '').trim()
    }};"#,
                sel = js_string(selector)
            ),

            Script::ForceClick { selector } => format!(
                r#"{enable}
    const el = $q({sel});
    if (!el) return {{ applied: false, error: 'control not found' }};
    $enable(el);
    el.click();
    return {{ applied: true }};"#,
                enable = FORCE_ENABLE_HELPER,
                sel = js_string(selector)
            ),

            Script::InnerElementClick { selector, inner } => format!(
                r#"{enable}
    const el = $q({sel});
    if (!el) return {{ applied: false, error: 'control not found' }};
    const inner = el.querySelector({inner});
    if (!inner) return {{ applied: false, error: 'inner element not found' }};
    $enable(el);
    inner.click();
    return {{ applied: true }};"#,
                enable = FORCE_ENABLE_HELPER,
                sel = js_string(selector),
                inner = js_string(inner)
            ),

            Script::PointerSequence { selector } => format!(
                r#"{enable}
    const el = $q({sel});
    if (!el) return {{ applied: false, error: 'control not found' }};
    $enable(el);
    const rect = el.getBoundingClientRect();
    const init = {{
        bubbles: true,
        cancelable: true,
        view: window,
        clientX: rect.left + rect.width / 2,
        clientY: rect.top + rect.height / 2
    }};
    el.dispatchEvent(new PointerEvent('pointerdown', init));
    el.dispatchEvent(new MouseEvent('mousedown', init));
    el.dispatchEvent(new PointerEvent('pointerup', init));
    el.dispatchEvent(new MouseEvent('mouseup', init));
    el.dispatchEvent(new MouseEvent('click', init));
    return {{ applied: true }};"#,
                enable = FORCE_ENABLE_HELPER,
                sel = js_string(selector)
            ),

            Script::SubmitForm { selector } => format!(
                r#"const el = $q({sel});
    if (!el) return {{ applied: false, error: 'control not found' }};
    const form = el.closest('form');
    if (form) {{
        form.submit();
        return {{ applied: true, via: 'form' }};
    }}
    el.dispatchEvent(new Event('submit', {{ bubbles: true }}));
    return {{ applied: true, via: 'event' }};"#,
                sel = js_string(selector)
            ),

            Script::SideEffect {
                selector,
                baseline_text,
                loading,
                url_markers,
            } => format!(
                r#"const baseline = {baseline};
    const loading = {loading}.some((s) => $q(s) !== null);
    const el = $q({sel});
    const controlChanged = baseline !== null
        && (!el || (el.textContent || '').trim() !== baseline);
    const href = window.location.href;
    const urlChanged = {markers}.some((m) => href.includes(m));
    return {{
        loading: loading,
        controlChanged: controlChanged,
        urlChanged: urlChanged,
        observed: loading || controlChanged || urlChanged
    }};"#,
                baseline = baseline_text
                    .as_deref()
                    .map(js_string)
                    .unwrap_or_else(|| "null".to_string()),
                loading = js_array(loading),
                sel = js_string(selector),
                markers = js_array(url_markers)
            ),

            Script::InspectPage => r#"const shown = (el) => el.offsetParent !== null;
    const fields = Array.from(document.querySelectorAll('textarea, input[type="text"], [contenteditable="true"]'))
        .filter(shown)
        .map((el) => ({
            tag: el.tagName.toLowerCase(),
            placeholder: el.getAttribute('placeholder') || '',
            id: el.id || '',
            className: typeof el.className === 'string' ? el.className : '',
            ariaLabel: el.getAttribute('aria-label') || ''
        }));
    const buttons = Array.from(document.querySelectorAll('button'))
        .filter(shown)
        .map((el) => ({
            text: (el.textContent || '').trim().slice(0, 30),
            ariaLabel: el.getAttribute('aria-label') || '',
            buttonType: el.type || '',
            disabled: !!el.disabled,
            hasIcon: el.querySelector('i, svg') !== null
        }));
    return { url: window.location.href, title: document.title, fields: fields, buttons: buttons };"#
                .to_string(),
        };

        format!("(() => {{\n    {}\n    {}\n}})()", QUERY_HELPER, body)
    }
}
