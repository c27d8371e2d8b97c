//! Rendering [`CompileError`]s into a report a caller can print or log.
//!
//! [`ErrorReporter::print`](crate::errors::ErrorReporter::print) is fine for
//! a quick look during development, but an embedding tool (an editor plugin,
//! a build step) wants a string it controls the destination of, and usually
//! a summary line up front. This module builds that string the same way:
//! push formatted lines onto an owned `String` rather than printing as you go.

use crate::errors::CompileError;

/// Renders one error per line as `"Line L:C error: message."`, matching
/// `CompileError`'s own `Display` impl.
pub fn render_errors(errors: &[CompileError]) -> String {
    let mut out = String::new();
    for err in errors {
        out.push_str(&err.to_string());
        out.push('\n');
    }
    out
}

/// Renders a full report: a summary line, then every error sorted by
/// source position so a reader sees earlier mistakes first.
pub fn render_report(errors: &[CompileError]) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        out.push_str("0 errors.\n");
        return out;
    }

    let mut sorted: Vec<&CompileError> = errors.iter().collect();
    sorted.sort_by_key(|e| (e.line, e.column));

    out.push_str(&format!(
        "{} error{}:\n",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    ));
    for err in sorted {
        out.push_str("  ");
        out.push_str(&err.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn empty_errors_reports_zero() {
        assert_eq!(render_report(&[]), "0 errors.\n");
    }

    #[test]
    fn report_sorts_by_position_and_counts_errors() {
        let errors = vec![
            CompileError {
                kind: ErrorKind::IncompatibleReturn,
                line: 5,
                column: 1,
            },
            CompileError {
                kind: ErrorKind::IncompatibleAssignment,
                line: 2,
                column: 3,
            },
        ];
        let report = render_report(&errors);
        assert!(report.starts_with("2 errors:\n"));
        let assign_pos = report.find("Line 2:3").unwrap();
        let return_pos = report.find("Line 5:1").unwrap();
        assert!(assign_pos < return_pos);
    }

    #[test]
    fn render_errors_matches_display_per_line() {
        let errors = vec![CompileError {
            kind: ErrorKind::NoMainProperlyDeclared,
            line: 0,
            column: 0,
        }];
        let rendered = render_errors(&errors);
        assert_eq!(
            rendered,
            "Line 0:0 error: There is no 'main' function properly declared.\n"
        );
    }
}
