/// Tries to identify whether this a javascript function
pub fn is_likely_js_function(function: impl AsRef<str>) -> bool {
    let mut fun = function.as_ref().trim_start();
    if fun.is_empty() {
        return false;
    }
    let mut offset = 0;

    if fun.starts_with("async ") {
        offset = "async ".len() - 1
    }

    if fun[offset..].trim_start().starts_with("function ") {
        return true;
    } else if skip_args(&mut fun) {
        // attempt to detect arrow functions by stripping the leading arguments and
        // looking for the arrow
        if fun.trim_start().starts_with("=>") {
            return true;
        }
    }
    false
}

/// This attempts to strip any leading pair of parentheses from the input
///
/// `()=>` -> `=>`
/// `(abc, def)=>` -> `=>`
fn skip_args(input: &mut &str) -> bool {
    if !input.starts_with('(') {
        return false;
    }
    let mut open = 1;
    let mut closed = 0;
    *input = &input[1..];
    while !input.is_empty() && open != closed {
        if let Some(idx) = input.find(&['(', ')'] as &[_]) {
            if &input[idx..=idx] == ")" {
                closed += 1;
            } else {
                open += 1;
            }
            *input = &input[idx + 1..];
        } else {
            break;
        }
    }

    open == closed
}

/// Network status codes content processes report for aborted navigations
const NETWORK_ERRORS: &[(u32, &str)] = &[
    (0x804B_0002, "NS_BINDING_ABORTED"),
    (0x804B_000A, "NS_ERROR_MALFORMED_URI"),
    (0x804B_000D, "NS_ERROR_CONNECTION_REFUSED"),
    (0x804B_000E, "NS_ERROR_NET_TIMEOUT"),
    (0x804B_0010, "NS_ERROR_OFFLINE"),
    (0x804B_0012, "NS_ERROR_UNKNOWN_PROTOCOL"),
    (0x804B_0014, "NS_ERROR_NET_RESET"),
    (0x804B_001E, "NS_ERROR_UNKNOWN_HOST"),
    (0x804B_001F, "NS_ERROR_REDIRECT_LOOP"),
    (0x804B_0047, "NS_ERROR_NET_INTERRUPT"),
    (0x8000_4004, "NS_ERROR_ABORT"),
    (0x8000_4005, "NS_ERROR_FAILURE"),
];

/// The symbolic name of a network status code, or its hex representation if
/// the code is unknown
pub fn network_error_text(code: u32) -> String {
    NETWORK_ERRORS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("<unknown error: 0x{:08X}>", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text() {
        assert_eq!(network_error_text(0x804B0002), "NS_BINDING_ABORTED");
        assert_eq!(network_error_text(0x804B001E), "NS_ERROR_UNKNOWN_HOST");
        assert_eq!(network_error_text(0xDEAD), "<unknown error: 0x0000DEAD>");
    }

    #[test]
    fn is_js_function() {
        assert!(is_likely_js_function("function abc() {}"));
        assert!(is_likely_js_function("async function abc() {}"));
        assert!(is_likely_js_function("() => {}"));
        assert!(is_likely_js_function("(abc, def) => {}"));
        assert!(is_likely_js_function("((abc), (def)) => {}"));
        assert!(is_likely_js_function("() => Promise.resolve(100 / 25)"));
    }
}
