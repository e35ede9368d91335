/// BTEC grade scale: 0..4 maps to a single-letter grade. Anything outside
/// the scale falls back to "R"; callers rely on the fallback being defined,
/// not on it being meaningful.
pub fn num_to_letter(number: i64) -> &'static str {
    match number {
        0 => "N",
        1 => "R",
        2 => "P",
        3 => "M",
        4 => "D",
        _ => "R",
    }
}

/// Criterion-level scale: a criterion is either not met (0) or achieved (1).
/// Any other stored score is surfaced as "?" so bad upstream data degrades
/// visibly instead of aborting the report.
pub fn criterion_num_to_letter(score: i64) -> &'static str {
    match score {
        0 => "N",
        1 => "A",
        _ => "?",
    }
}

/// CSS class for an overall grade letter. Letters outside R/P/M/D get no
/// style.
pub fn grade_style(letter: &str) -> &'static str {
    match letter {
        "R" => "refer",
        "P" => "pass",
        "M" => "merit",
        "D" => "distinction",
        _ => "",
    }
}

/// Inverse of `num_to_letter` for ceiling computation. 'N' is pinned to 1:
/// the legacy scale treated "not met" as the refer band when ranking
/// criterion initials (P1 < M1 < D1). Unknown letters map to 0.
pub fn letter_to_num(letter: char) -> i64 {
    match letter {
        'N' | 'R' => 1,
        'P' => 2,
        'M' => 3,
        'D' => 4,
        _ => 0,
    }
}
