//! Disfluency cleanup and fact-span splitting
//!
//! Transcribed speech and typed chat go through the same path: fillers are
//! dropped, stuttered words collapsed, spelled-out numbers turned into digits
//! and the utterance cut into candidate fact spans.

use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// STATIC REGEX PATTERNS
// =============================================================================

static FILLERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i),?\s*\b(?:u+m+|u+h+|erm+|hmm+|you know|i mean|basically|actually|matlab|so yeah)\b\s*,?",
    )
    .unwrap()
});

/// "like 50 lakh" used as a hedge before a number
static HEDGE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\blike\s+(\d)").unwrap());

static BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bbetween\s+(\S+(?:\s+(?:lakhs?|lacs?|crores?|cr|thousand|k))?)\s+and\s+")
        .unwrap()
});

static SPAN_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[,;!?\n]+|\.\s+|\.$|\s+(?:and|but|aur|also|plus|lekin)\s+").unwrap()
});

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Clean an utterance, keeping the original casing
pub fn normalize(text: &str) -> String {
    let text = FILLERS.replace_all(text, " ");
    let text = HEDGE_LIKE.replace_all(&text, "$1");
    let text = collapse_repeats(&text);
    let text = number_words_to_digits(&text);
    let text = BETWEEN.replace_all(&text, "${1} to ");
    SPACES.replace_all(text.trim(), " ").to_string()
}

/// Cut a normalized utterance into candidate fact spans
pub fn split_spans(text: &str) -> Vec<String> {
    SPAN_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drop immediately repeated alphabetic words ("we we make" -> "we make")
fn collapse_repeats(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for token in text.split_whitespace() {
        if let Some(prev) = out.last() {
            if token.chars().all(char::is_alphabetic) && prev.eq_ignore_ascii_case(token) {
                continue;
            }
        }
        out.push(token);
    }
    out.join(" ")
}

// =============================================================================
// Number words
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberWord {
    Unit(u64),
    Tens(u64),
    Hundred,
    Thousand,
}

fn number_word(word: &str) -> Option<NumberWord> {
    use NumberWord::*;
    let w = match word {
        "zero" => Unit(0),
        "one" => Unit(1),
        "two" => Unit(2),
        "three" => Unit(3),
        "four" => Unit(4),
        "five" => Unit(5),
        "six" => Unit(6),
        "seven" => Unit(7),
        "eight" => Unit(8),
        "nine" => Unit(9),
        "ten" => Unit(10),
        "eleven" => Unit(11),
        "twelve" => Unit(12),
        "thirteen" => Unit(13),
        "fourteen" => Unit(14),
        "fifteen" => Unit(15),
        "sixteen" => Unit(16),
        "seventeen" => Unit(17),
        "eighteen" => Unit(18),
        "nineteen" => Unit(19),
        "twenty" => Tens(20),
        "thirty" => Tens(30),
        "forty" => Tens(40),
        "fifty" => Tens(50),
        "sixty" => Tens(60),
        "seventy" => Tens(70),
        "eighty" => Tens(80),
        "ninety" => Tens(90),
        "hundred" => Hundred,
        "thousand" => Thousand,
        _ => return None,
    };
    Some(w)
}

/// Words after which a lone "one" is a quantity rather than a pronoun
fn is_magnitude(word: &str) -> bool {
    matches!(
        word,
        "lakh" | "lakhs" | "lac" | "lacs" | "crore" | "crores" | "cr" | "year" | "years" | "saal"
    )
}

/// Split a token into its lowercase alphabetic core and trailing punctuation
fn split_token(token: &str) -> (String, &str) {
    let end = token
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphanumeric())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    (token[..end].to_lowercase(), &token[end..])
}

fn number_words_to_digits(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let mut group = Vec::new();
        let mut trailing = "";
        let mut j = i;
        while j < tokens.len() {
            let (core, punct) = split_token(tokens[j]);
            match number_word(&core) {
                Some(w) => {
                    group.push(w);
                    j += 1;
                    if !punct.is_empty() {
                        trailing = punct;
                        break;
                    }
                }
                None => break,
            }
        }

        if group.is_empty() {
            out.push(tokens[i].to_string());
            i += 1;
            continue;
        }

        let lone_one = group == [NumberWord::Unit(1)]
            && !tokens
                .get(j)
                .map(|next| is_magnitude(&split_token(next).0))
                .unwrap_or(false);
        if lone_one {
            out.extend(tokens[i..j].iter().map(|t| t.to_string()));
        } else {
            let values = evaluate(&group);
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            out.push(format!("{}{}", rendered.join(" "), trailing));
        }
        i = j;
    }

    out.join(" ")
}

/// Turn a run of number words into one or more values. Year-style pairs
/// ("twenty twenty one", "nineteen ninety") become a single four-digit value.
fn evaluate(words: &[NumberWord]) -> Vec<u64> {
    if words
        .iter()
        .any(|w| matches!(w, NumberWord::Hundred | NumberWord::Thousand))
    {
        let mut total = 0;
        let mut current = 0;
        for w in words {
            match w {
                NumberWord::Unit(n) | NumberWord::Tens(n) => current += n,
                NumberWord::Hundred => current = current.max(1) * 100,
                NumberWord::Thousand => {
                    total += current.max(1) * 1000;
                    current = 0;
                }
            }
        }
        return vec![total + current];
    }

    let mut chunks: Vec<u64> = Vec::new();
    let mut open_tens: Option<u64> = None;
    for w in words {
        match (*w, open_tens) {
            (NumberWord::Unit(u), Some(t)) if (1..=9).contains(&u) => {
                chunks.push(t + u);
                open_tens = None;
            }
            (NumberWord::Unit(u), pending) => {
                chunks.extend(pending);
                chunks.push(u);
                open_tens = None;
            }
            (NumberWord::Tens(t), pending) => {
                chunks.extend(pending);
                open_tens = Some(t);
            }
            _ => {}
        }
    }
    chunks.extend(open_tens);

    if chunks.len() == 2 && chunks[0] >= 10 && chunks[1] < 100 {
        vec![chunks[0] * 100 + chunks[1]]
    } else {
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fillers_removed() {
        assert_eq!(
            normalize("um so our turnover is, uh, around 80 lakh you know"),
            "so our turnover is around 80 lakh"
        );
        assert_eq!(normalize("it is like 50 lakh"), "it is 50 lakh");
    }

    #[test]
    fn test_affirmations_survive() {
        assert_eq!(normalize("haan udyam hai"), "haan udyam hai");
    }

    #[test]
    fn test_repeats_collapsed() {
        assert_eq!(normalize("we we make make steel"), "we make steel");
        assert_eq!(normalize("50 50 lakh"), "50 50 lakh");
    }

    #[test]
    fn test_number_words() {
        assert_eq!(normalize("started in twenty twenty one"), "started in 2021");
        assert_eq!(normalize("need fifty five lakh"), "need 55 lakh");
        assert_eq!(normalize("two thousand nineteen"), "2019");
        assert_eq!(normalize("five years old"), "5 years old");
        assert_eq!(normalize("one crore"), "1 crore");
        assert_eq!(normalize("which one is better"), "which one is better");
    }

    #[test]
    fn test_between_rewritten() {
        assert_eq!(normalize("between 50 and 60 lakh"), "50 to 60 lakh");
        assert_eq!(normalize("between 50 lakh and 1 crore"), "50 lakh to 1 crore");
    }

    #[test]
    fn test_split_spans() {
        let spans = split_spans("manufacturing, started 2021. turnover 80 lakh and no collateral");
        assert_eq!(
            spans,
            vec!["manufacturing", "started 2021", "turnover 80 lakh", "no collateral"]
        );
    }

    #[test]
    fn test_decimal_not_split() {
        assert_eq!(split_spans("need 1.5 crore"), vec!["need 1.5 crore"]);
    }
}
