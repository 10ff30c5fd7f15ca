//! Wildcard masks for enumeration.

/// Matches `name` against a mask with `*` (any run of characters) and `?`
/// (exactly one character). Case-insensitive; `/` and `\` are the same
/// separator. An empty mask matches everything.
pub(crate) fn matches(name: &str, mask: &str) -> bool {
    if mask.is_empty() || mask == "*" {
        return true;
    }

    let name: Vec<char> = normalize(name).collect();
    let mask: Vec<char> = normalize(mask).collect();
    match_from(&name, &mask)
}

/// Canonical form used for comparing archived names.
pub(crate) fn normalize(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars()
        .map(|c| if c == '/' { '\\' } else { c })
        .flat_map(char::to_lowercase)
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    normalize(a).eq(normalize(b))
}

/// Iterative wildcard match. On a mismatch the last `*` absorbs one more
/// character of the name and matching resumes after it.
fn match_from(name: &[char], mask: &[char]) -> bool {
    let (mut n, mut m) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        match mask.get(m) {
            Some('*') => {
                star = Some((m, n));
                m += 1;
            }
            Some('?') => {
                n += 1;
                m += 1;
            }
            Some(c) if *c == name[n] => {
                n += 1;
                m += 1;
            }
            _ => match star {
                Some((star_m, star_n)) => {
                    star = Some((star_m, star_n + 1));
                    m = star_m + 1;
                    n = star_n + 1;
                }
                None => return false,
            },
        }
    }

    mask[m..].iter().all(|c| *c == '*')
}
