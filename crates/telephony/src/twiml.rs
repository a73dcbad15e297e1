//! TwiML rendering
//!
//! Pure function from script directives to the gateway's markup document.
//! No state, no I/O; identical directives always produce byte-identical
//! output.

use crate::directive::ScriptDirective;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render a directive list into a complete TwiML document.
///
/// `voice` is applied to every `<Say>` verb. All free text is XML-escaped.
pub fn render(directives: &[ScriptDirective], voice: &str) -> String {
    let mut doc = String::with_capacity(256);
    doc.push_str(XML_HEADER);
    doc.push_str("<Response>");

    for directive in directives {
        match directive {
            ScriptDirective::Speak { text } => {
                doc.push_str(&format!(
                    r#"<Say voice="{}">{}</Say>"#,
                    escape(voice),
                    escape(text)
                ));
            }
            ScriptDirective::Capture {
                timeout_seconds,
                action,
            } => {
                // actionOnEmptyResult makes a silent timeout still post to
                // the action URL, so no-input turns reach the orchestrator
                doc.push_str(&format!(
                    r#"<Gather input="speech" speechTimeout="auto" actionOnEmptyResult="true" timeout="{}" action="{}"/>"#,
                    timeout_seconds,
                    escape(action)
                ));
            }
            ScriptDirective::Record {
                max_length_seconds,
                transcribe_callback,
            } => {
                doc.push_str(&format!(
                    r#"<Record transcribe="true" transcribeCallback="{}" maxLength="{}" playBeep="true" trim="trim-silence"/>"#,
                    escape(transcribe_callback),
                    max_length_seconds
                ));
            }
            ScriptDirective::Pause { seconds } => {
                doc.push_str(&format!(r#"<Pause length="{}"/>"#, seconds));
            }
            ScriptDirective::Redirect { target } => {
                doc.push_str(&format!("<Redirect>{}</Redirect>", escape(target)));
            }
            ScriptDirective::Hangup => {
                doc.push_str("<Hangup/>");
            }
        }
    }

    doc.push_str("</Response>");
    doc
}

/// Escape free text for XML element and attribute content
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{speak_then_capture, speak_then_hangup};

    #[test]
    fn test_speak_then_capture_document() {
        let doc = render(&speak_then_capture("Hello!", 5, "/voice"), "Polly.Joanna");

        assert!(doc.starts_with(XML_HEADER));
        assert!(doc.contains(r#"<Say voice="Polly.Joanna">Hello!</Say>"#));
        assert!(doc.contains(r#"timeout="5" action="/voice"#));
        assert!(doc.ends_with("</Response>"));
    }

    #[test]
    fn test_silent_capture_still_posts_to_action() {
        let doc = render(&[ScriptDirective::capture(5, "/voice")], "Polly.Joanna");
        assert!(doc.contains(r#"actionOnEmptyResult="true""#));
    }

    #[test]
    fn test_speak_then_hangup_document() {
        let doc = render(&speak_then_hangup("Goodbye"), "Polly.Joanna");
        assert!(doc.contains("<Hangup/>"));
        assert!(!doc.contains("<Gather"));
    }

    #[test]
    fn test_free_text_is_escaped() {
        let doc = render(
            &[ScriptDirective::speak(r#"Bed & breakfast <deals> "cheap""#)],
            "Polly.Joanna",
        );
        assert!(doc.contains("Bed &amp; breakfast &lt;deals&gt; &quot;cheap&quot;"));
        assert!(!doc.contains("<deals>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let directives = speak_then_capture("Same input", 7, "/voice");
        let a = render(&directives, "Polly.Joanna");
        let b = render(&directives, "Polly.Joanna");
        assert_eq!(a, b);
    }

    #[test]
    fn test_record_and_pause_verbs() {
        let doc = render(
            &[
                ScriptDirective::Record {
                    max_length_seconds: 15,
                    transcribe_callback: "/transcription".to_string(),
                },
                ScriptDirective::Pause { seconds: 2 },
            ],
            "Polly.Joanna",
        );
        assert!(doc.contains(r#"transcribeCallback="/transcription""#));
        assert!(doc.contains(r#"maxLength="15""#));
        assert!(doc.contains(r#"<Pause length="2"/>"#));
    }
}
