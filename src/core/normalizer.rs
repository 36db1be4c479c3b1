//! Maps user-typed institution and major names onto the publisher's names.

/// Aliases shorter than this never take part in substring matching.
const MIN_SUBSTRING_KEY_LEN: usize = 4;

const INSTITUTION_ALIASES: &[(&str, &str)] = &[
    // Community colleges
    ("de anza", "De Anza College"),
    ("de anza college", "De Anza College"),
    ("foothill", "Foothill College"),
    ("foothill college", "Foothill College"),
    ("diablo valley", "Diablo Valley College"),
    ("diablo valley college", "Diablo Valley College"),
    ("city college of san francisco", "City College of San Francisco"),
    ("ccsf", "City College of San Francisco"),
    // UC system
    ("uc berkeley", "University of California, Berkeley"),
    ("ucb", "University of California, Berkeley"),
    ("berkeley", "University of California, Berkeley"),
    ("university of california berkeley", "University of California, Berkeley"),
    ("university of california, berkeley", "University of California, Berkeley"),
    ("uc davis", "University of California, Davis"),
    ("ucd", "University of California, Davis"),
    ("davis", "University of California, Davis"),
    ("uc irvine", "University of California, Irvine"),
    ("uci", "University of California, Irvine"),
    ("irvine", "University of California, Irvine"),
    ("uc los angeles", "University of California, Los Angeles"),
    ("ucla", "University of California, Los Angeles"),
    ("los angeles", "University of California, Los Angeles"),
    ("uc san diego", "University of California, San Diego"),
    ("ucsd", "University of California, San Diego"),
    ("san diego", "University of California, San Diego"),
    ("uc santa barbara", "University of California, Santa Barbara"),
    ("ucsb", "University of California, Santa Barbara"),
    ("santa barbara", "University of California, Santa Barbara"),
    // CSU system
    ("san jose state", "San Jose State University"),
    ("sjsu", "San Jose State University"),
    ("san francisco state", "San Francisco State University"),
    ("sfsu", "San Francisco State University"),
];

const MAJOR_ALIASES: &[(&str, &str)] = &[
    ("cs", "Computer Science"),
    ("computer science", "Computer Science"),
    ("comp sci", "Computer Science"),
    ("computer sci", "Computer Science"),
    ("csc", "Computer Science"),
    ("math", "Mathematics"),
    ("mathematics", "Mathematics"),
    ("applied math", "Applied Mathematics"),
    ("applied mathematics", "Applied Mathematics"),
    ("pure math", "Pure Mathematics"),
    ("pure mathematics", "Pure Mathematics"),
    ("ee", "Electrical Engineering"),
    ("electrical engineering", "Electrical Engineering"),
    ("computer engineering", "Computer Engineering"),
    ("comp eng", "Computer Engineering"),
    ("cpe", "Computer Engineering"),
    ("me", "Mechanical Engineering"),
    ("mechanical engineering", "Mechanical Engineering"),
    ("ce", "Civil Engineering"),
    ("civil engineering", "Civil Engineering"),
    ("chemical engineering", "Chemical Engineering"),
    ("chem eng", "Chemical Engineering"),
    ("bioengineering", "Bioengineering"),
    ("bio eng", "Bioengineering"),
    ("business", "Business Administration"),
    ("business admin", "Business Administration"),
    ("business administration", "Business Administration"),
    ("econ", "Economics"),
    ("economics", "Economics"),
    ("bio", "Biology"),
    ("biology", "Biology"),
    ("biochemistry", "Biochemistry"),
    ("biochem", "Biochemistry"),
    ("molecular biology", "Molecular Biology"),
    ("chem", "Chemistry"),
    ("chemistry", "Chemistry"),
    ("physics", "Physics"),
    ("astrophysics", "Astrophysics"),
    ("psych", "Psychology"),
    ("psychology", "Psychology"),
    ("english", "English"),
    ("english lit", "English Literature"),
    ("english literature", "English Literature"),
    ("history", "History"),
    ("hist", "History"),
    ("poli sci", "Political Science"),
    ("political science", "Political Science"),
    ("polisci", "Political Science"),
    ("art", "Art"),
    ("fine art", "Fine Arts"),
    ("fine arts", "Fine Arts"),
    ("art history", "Art History"),
    ("comm", "Communication Studies"),
    ("communication", "Communication Studies"),
    ("communications", "Communication Studies"),
    ("communication studies", "Communication Studies"),
    ("soc", "Sociology"),
    ("sociology", "Sociology"),
    ("anthro", "Anthropology"),
    ("anthropology", "Anthropology"),
    ("phil", "Philosophy"),
    ("philosophy", "Philosophy"),
];

pub fn normalize_institution(raw: &str) -> String {
    normalize_with(INSTITUTION_ALIASES, raw)
}

pub fn normalize_major(raw: &str) -> String {
    normalize_with(MAJOR_ALIASES, raw)
}

/// Table hit for an institution name, if any.
pub fn lookup_institution(raw: &str) -> Option<&'static str> {
    lookup(INSTITUTION_ALIASES, raw)
}

/// Table hit for a major name, if any.
pub fn lookup_major(raw: &str) -> Option<&'static str> {
    lookup(MAJOR_ALIASES, raw)
}

fn normalize_with(table: &[(&str, &'static str)], raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match lookup(table, raw) {
        Some(canonical) => canonical.to_string(),
        None => title_case(raw),
    }
}

fn lookup(table: &[(&str, &'static str)], raw: &str) -> Option<&'static str> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    // 完全相符：別名或已是標準名稱
    if let Some((_, canonical)) = table.iter().find(|(alias, _)| *alias == needle) {
        return Some(canonical);
    }
    if let Some((_, canonical)) = table
        .iter()
        .find(|(_, canonical)| canonical.to_lowercase() == needle)
    {
        return Some(canonical);
    }

    // 部分相符：只比對較長的別名，避免短縮寫誤判
    table
        .iter()
        .filter(|(alias, _)| alias.len() >= MIN_SUBSTRING_KEY_LEN)
        .find(|(alias, _)| needle.contains(alias))
        .map(|(_, canonical)| *canonical)
}

/// Capitalizes the first letter of every alphabetic run and lower-cases the rest.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut previous_is_alpha = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if previous_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            out.push(c);
            previous_is_alpha = false;
        }
    }
    out
}
