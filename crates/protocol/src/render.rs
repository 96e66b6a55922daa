//! Message rendering
//!
//! Messages may carry `%s` placeholders that are substituted with the
//! entry's tags in order at render time, keeping the wire format free of
//! pre-formatted strings.

/// Substitute `%s` placeholders in `message` with tags in order.
///
/// `%%` escapes a literal percent sign. Placeholders beyond the number of
/// available tags are left verbatim.
pub(crate) fn render_message<'a>(
    message: &str,
    tags: &mut dyn Iterator<Item = &'a str>,
) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some('%') => {
                out.push('%');
                chars.next();
            }
            Some('s') => match tags.next() {
                Some(tag) => {
                    out.push_str(tag);
                    chars.next();
                }
                None => {
                    out.push('%');
                    out.push('s');
                    chars.next();
                }
            },
            _ => out.push('%'),
        }
    }

    out
}
