use once_cell::sync::Lazy;
use regex::Regex;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid cleaning pattern")
}

static NARRATION_MARKERS: Lazy<Regex> = Lazy::new(|| pattern(r"\[SYNC:\s*\d+\]|\[PAUSE\]"));
static BRACKETED: Lazy<Regex> = Lazy::new(|| pattern(r"\[[^\]]+\]"));
static LATEX_COMMAND: Lazy<Regex> = Lazy::new(|| pattern(r"\\[a-zA-Z]+(?:\{[^}]*\})*"));
static LATEX_SYMBOLS: Lazy<Regex> = Lazy::new(|| pattern(r"[\\{}_^]"));
static DISPLAY_MATH: Lazy<Regex> = Lazy::new(|| pattern(r"(?s)\$\$.*?\$\$"));
static INLINE_MATH: Lazy<Regex> = Lazy::new(|| pattern(r"\$[^$]+\$"));
static OPERATORS: Lazy<Regex> = Lazy::new(|| pattern(r"[<>=+*/|$]"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| pattern(r"\s+"));

/// Notation the generic rules would drop or mangle, and how to say it.
const SPOKEN_SYMBOLS: &[(&str, &str)] = &[
    ("∂", "partial"),
    ("∫", "integral"),
    ("∑", "sum"),
    ("√", "square root"),
    ("∞", "infinity"),
    ("≈", "approximately"),
    ("≠", "not equal to"),
    ("≤", "less than or equal to"),
    ("≥", "greater than or equal to"),
    ("±", "plus or minus"),
    ("×", "times"),
    ("÷", "divided by"),
    ("→", "to"),
    ("π", "pi"),
    ("θ", "theta"),
    ("α", "alpha"),
    ("β", "beta"),
    ("λ", "lambda"),
    ("Δ", "delta"),
    ("²", "squared"),
    ("³", "cubed"),
    ("°", "degrees"),
    ("%", "percent"),
    ("&", "and"),
];

/// Normalize narration text so a speech engine can read it aloud.
///
/// Markup is stripped with generic rules first; the symbol dictionary then
/// spells out common notation. The result is stable under re-cleaning.
pub fn clean_text_for_speech(text: &str) -> String {
    let text = NARRATION_MARKERS.replace_all(text, " ");
    let text = BRACKETED.replace_all(&text, " ");
    let text = LATEX_COMMAND.replace_all(&text, " ");
    let text = LATEX_SYMBOLS.replace_all(&text, " ");
    let text = DISPLAY_MATH.replace_all(&text, " equation ");
    let text = INLINE_MATH.replace_all(&text, " symbol ");
    // unpaired `$` left by the math rules goes with the operators
    let text = OPERATORS.replace_all(&text, " ");
    let text = collapse_whitespace(&text);

    let mut spoken = text;
    for (symbol, word) in SPOKEN_SYMBOLS {
        if spoken.contains(symbol) {
            spoken = spoken.replace(symbol, &format!(" {} ", word));
        }
    }
    collapse_whitespace(&spoken)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}
