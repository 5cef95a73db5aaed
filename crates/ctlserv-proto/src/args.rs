//! Command-line tokenization: `;` separates commands, `,` separates
//! arguments. Segments are never trimmed; embedded whitespace belongs to
//! whichever argument it appears in.

/// Split a received line into command segments.
pub fn split_commands(line: &str) -> Vec<&str> {
    line.split(';').collect()
}

/// Split one command segment into its argument vector.
///
/// An empty segment yields zero arguments, which the parser treats as a
/// fatal `EmptyCommand` for the whole line.
pub fn split_args(segment: &str) -> Vec<String> {
    if segment.is_empty() {
        return Vec::new();
    }
    segment.split(',').map(str::to_string).collect()
}

/// Rejoin an argument vector into the comma form used in status lines.
///
/// Inverse of [`split_args`] for any vector whose elements contain no
/// commas.
pub fn rebuild_args(args: &[String]) -> String {
    args.join(",")
}
