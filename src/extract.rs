use tracing::debug;

use crate::descriptor::{build_descriptors, FieldDescriptor, RawField};
use crate::error::{Error, Result};
use crate::page::Page;

/// In-page routine collecting one raw record per form control, in document
/// order. It also stamps every element with a stable `data-autoform-id`
/// handle (reusing an existing stamp, so re-extraction keeps addresses
/// stable across passes on dynamic forms).
const EXTRACT_JS: &str = r#"
    JSON.stringify((function() {
        function visible(el) {
            const style = window.getComputedStyle(el);
            return style.display !== 'none' && style.visibility !== 'hidden';
        }
        function explicitLabel(el) {
            if (el.id) {
                const lab = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
                if (lab) return (lab.innerText || '').trim();
            }
            const wrap = el.closest('label');
            if (wrap) return (wrap.innerText || '').trim();
            return '';
        }
        function precedingText(el) {
            let cur = el;
            for (let depth = 0; cur && depth < 3; depth++) {
                let sib = cur.previousSibling;
                while (sib) {
                    let text = '';
                    if (sib.nodeType === Node.TEXT_NODE) {
                        text = sib.textContent || '';
                    } else if (sib.nodeType === Node.ELEMENT_NODE
                            && !sib.matches('input, select, textarea, option, script, style')) {
                        text = sib.innerText || '';
                    }
                    text = text.trim();
                    if (text) return text.slice(0, 120);
                    sib = sib.previousSibling;
                }
                cur = cur.parentElement;
            }
            return '';
        }
        document.__autoformSeq = document.__autoformSeq || 0;
        return Array.from(document.querySelectorAll('input, select, textarea')).map(el => {
            const firstSeen = !el.dataset.autoformId;
            if (firstSeen) el.dataset.autoformId = 'af-' + (document.__autoformSeq++);
            return {
                tag: el.tagName.toLowerCase(),
                type: (el.type || '').toLowerCase(),
                name: el.name || '',
                id: el.id || '',
                autoformId: el.dataset.autoformId,
                value: el.value || '',
                placeholder: el.placeholder || '',
                ariaLabel: el.getAttribute('aria-label') || '',
                label: explicitLabel(el),
                precedingText: precedingText(el),
                required: !!el.required,
                disabled: !!el.disabled,
                hidden: !visible(el),
                firstSeen: firstSeen,
                checked: !!el.checked,
                multiple: !!el.multiple,
                maxLength: (typeof el.maxLength === 'number' ? el.maxLength : -1),
                options: el.tagName.toLowerCase() === 'select'
                    ? Array.from(el.options).map(o => ({ value: o.value, text: (o.text || '').trim() }))
                    : []
            };
        });
    })())
"#;

/// Inspect the live document and produce the fillable field descriptors in
/// document order. Read-only apart from the `data-autoform-id` stamps.
/// Descriptors are fresh per call; dynamic forms may re-render, so callers
/// re-extract on every attempt.
pub async fn extract_fields(page: &Page) -> Result<Vec<FieldDescriptor>> {
    let json = page
        .evaluate_string(EXTRACT_JS)
        .await
        .map_err(|e| Error::StaleDocument(e.to_string()))?;
    let raws: Vec<RawField> =
        serde_json::from_str(&json).map_err(|e| Error::JsError(format!("bad extraction payload: {e}")))?;
    let descriptors = build_descriptors(raws);
    debug!(raw = json.len(), fields = descriptors.len(), "extracted field descriptors");
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldKind;

    // The in-page half needs a browser (covered in tests/integration.rs);
    // the payload decoding half is pure.
    #[test]
    fn decodes_extraction_payload() {
        let json = r#"[
            {"tag":"input","type":"text","name":"full_name","id":"fn","autoformId":"af-0",
             "value":"","placeholder":"","ariaLabel":"","label":"Full Name","precedingText":"",
             "required":true,"disabled":false,"hidden":false,"firstSeen":true,"checked":false,
             "multiple":false,"maxLength":-1,"options":[]},
            {"tag":"select","type":"select-one","name":"degree","id":"","autoformId":"af-1",
             "value":"","placeholder":"","ariaLabel":"","label":"Degree","precedingText":"",
             "required":false,"disabled":false,"hidden":false,"firstSeen":true,"checked":false,
             "multiple":false,"maxLength":-1,
             "options":[{"value":"bs","text":"Bachelor's"},{"value":"ms","text":"Master's"}]}
        ]"#;
        let raws: Vec<RawField> = serde_json::from_str(json).unwrap();
        let descriptors = build_descriptors(raws);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].kind, FieldKind::Text);
        assert!(descriptors[0].required);
        assert_eq!(descriptors[1].kind, FieldKind::SingleSelect);
        assert_eq!(descriptors[1].options[1].display_text, "Master's");
    }
}
