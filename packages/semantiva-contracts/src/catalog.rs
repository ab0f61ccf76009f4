//! Documentation view over the SVA rule catalog (§4.H), used by `dev lint --help-rules`.

use crate::messages::MESSAGES;

/// A read-only handle onto [`MESSAGES`], the single source of truth for every documented SVA
/// code. Kept as a distinct type (rather than exposing `MESSAGES` directly) so the CLI's
/// `--help-rules` output has one obvious place to render from.
pub struct Catalog;

impl Catalog {
    pub fn to_markdown_table() -> String {
        let mut out = String::from("| Code | Message |\n| --- | --- |\n");
        for (code, message) in MESSAGES {
            out.push_str(&format!("| {code} | {message} |\n"));
        }
        out
    }
}
