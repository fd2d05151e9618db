// Line-oriented unified diff rendering for statute text.
//
// `similar` computes the line ops; the hunk grouping and the rendered form
// (`@@ -a,b +c,d @@` headers, -/+/space prefixes) are ours so the output is
// stable no matter what the library's own formatter does between versions.

use similar::{ChangeTag, TextDiff};

/// Render a unified diff between two section bodies.
/// Returns the empty string when the texts are identical.
pub fn render_unified(old: &str, new: &str, context: usize) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();

    for group in diff.grouped_ops(context) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let old_len = last.old_range().end - old_start;
        let new_start = first.new_range().start;
        let new_len = last.new_range().end - new_start;

        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            hunk_coord(old_start, old_len),
            hunk_coord(new_start, new_len)
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                out.push(sign);
                let value = change.value();
                out.push_str(value);
                if !value.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }

    out
}

/// Unified-diff hunk coordinate: 1-based start, length elided when 1, and a
/// zero-length range keeps the 0-based anchor.
fn hunk_coord(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_render_empty() {
        assert_eq!(render_unified("a\nb\n", "a\nb\n", 3), "");
    }

    #[test]
    fn test_single_line_change() {
        let old = "first\nsecond\nthird\n";
        let new = "first\nchanged\nthird\n";
        let rendered = render_unified(old, new, 1);

        assert!(rendered.starts_with("@@ -1,3 +1,3 @@\n"));
        assert!(rendered.contains(" first\n"));
        assert!(rendered.contains("-second\n"));
        assert!(rendered.contains("+changed\n"));
        assert!(rendered.contains(" third\n"));
    }

    #[test]
    fn test_distant_changes_get_separate_hunks() {
        let old: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        let new = old.replace("line 2\n", "line two\n").replace("line 28\n", "line umpteen\n");
        let rendered = render_unified(&old, &new, 2);

        let hunks = rendered.matches("@@ -").count();
        assert_eq!(hunks, 2);
        assert!(rendered.contains("-line 2\n"));
        assert!(rendered.contains("+line two\n"));
        assert!(rendered.contains("-line 28\n"));
        assert!(rendered.contains("+line umpteen\n"));
        // Only two context lines around each change.
        assert!(!rendered.contains(" line 10\n"));
    }

    #[test]
    fn test_pure_insertion_coordinates() {
        let rendered = render_unified("", "brand new\n", 3);
        assert!(rendered.starts_with("@@ -0,0 +1 @@\n"), "got: {rendered}");
        assert!(rendered.contains("+brand new\n"));
    }

    #[test]
    fn test_missing_trailing_newline_is_normalized() {
        let rendered = render_unified("alpha", "beta", 3);
        assert!(rendered.contains("-alpha\n"));
        assert!(rendered.contains("+beta\n"));
        assert!(rendered.ends_with('\n'));
    }
}