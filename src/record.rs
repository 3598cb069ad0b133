//! Call-site tagging and structured record formatting.
//!
//! Records produced here are flat attribute strings:
//!
//! ```text
//! type="warn" file="src/main.rs" method="app::worker" line="42" message="slow" rows="3"
//! ```
//!
//! The location attributes are omitted when no [`CallSite`] is supplied.

use std::fmt::Write as _;
use std::panic::Location;

use crate::level::Level;
use crate::parameter::KeyValue;

/// Source location of a logging call.
///
/// Rust has no portable way to walk the stack at runtime, so call sites are
/// captured at compile time by [`logship_call_site!`](crate::logship_call_site)
/// or through `#[track_caller]` via [`CallSite::caller`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSite {
    file: String,
    function: String,
    line: u32,
}

impl CallSite {
    /// Build a call site, keeping only the last two components of `file`.
    pub fn new(file: &str, function: &str, line: u32) -> Self {
        Self {
            file: short_path(file).to_owned(),
            function: function.to_owned(),
            line,
        }
    }

    /// Location of the caller of the function annotated with
    /// `#[track_caller]`. The function name is unknown and left empty.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), "", location.line())
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// `file:function:line` prefix used by the print-style emitters.
    pub fn tag(&self) -> String {
        format!("{}:{}:{}", self.file, self.function, self.line)
    }
}

fn short_path(path: &str) -> &str {
    let mut separators = path.rmatch_indices(['/', '\\']);
    match (separators.next(), separators.next()) {
        (Some(_), Some((idx, _))) => &path[idx + 1..],
        _ => path,
    }
}

fn push_attr(buf: &mut String, key: &str, value: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(key);
    buf.push_str("=\"");
    buf.push_str(value);
    buf.push('"');
}

/// Render a structured record.
///
/// Attributes appear in a fixed order: `type`, the optional location triple,
/// `message`, then `params` in the order given. Values are not escaped.
pub fn format_data(
    level: Level,
    message: &str,
    site: Option<&CallSite>,
    params: &[&dyn KeyValue],
) -> String {
    let mut buf = String::with_capacity(48 + message.len() + params.len() * 16);
    push_attr(&mut buf, "type", level.as_str());
    if let Some(site) = site {
        push_attr(&mut buf, "file", &site.file);
        push_attr(&mut buf, "method", &site.function);
        buf.push_str(" line=\"");
        let _ = write!(buf, "{}", site.line);
        buf.push('"');
    }
    push_attr(&mut buf, "message", message);
    for param in params {
        push_attr(&mut buf, param.key(), &param.value());
    }
    buf
}
