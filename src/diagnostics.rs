//! Human-readable rendering of specialization errors.

use crate::ast::anchor::Anchor;
use crate::error::Error;
use crate::session::Session;

fn render_anchor(session: &Session, anchor: Anchor) -> String {
    if anchor.is_known() {
        format!(
            "{}:{}:{}",
            session.source_name(anchor.source),
            anchor.line,
            anchor.column
        )
    } else {
        String::from("<unknown>")
    }
}

/// Renders a compiler-style diagnostic for `err`:
///
/// ```text
/// error: cannot merge expression types i32 and string
///  --> demo.keel:4:9
///     while checking call at demo.keel:4:3
///     in function 'count' at demo.keel:2:1
/// ```
pub fn render_error(session: &Session, err: &Error) -> String {
    let mut out = format!("error: {}\n", err.kind);
    if let Some(anchor) = err.anchor {
        out.push_str(&format!(" --> {}\n", render_anchor(session, anchor)));
    }
    for frame in &err.trace {
        out.push_str(&format!(
            "    {} at {}\n",
            frame.context,
            render_anchor(session, frame.anchor)
        ));
    }
    out
}
