/// Heuristic extraction of definitions, requirements, actions and deadlines.
///
/// This is best-effort pattern matching over sentences, not parsing. It keys on the
/// phrasing policy text conventionally uses:
/// - definitions: `<Term> means ...`, `shall mean`, `is defined as`, `refers to`
/// - requirements: `shall`, `must`, `is required to`, `obligated to`, `mandatory`, `should`
/// - actions: `<party> is responsible for ...`, `<party> shall <verb> ...`
/// - deadlines: `by|before|no later than|within ...` followed by a date or a period
///
/// Text that does not use these cues yields nothing, and unusual phrasing can produce
/// false positives. A missing pattern is never an error: the result is just empty.
use regex::Regex;

use crate::model::{
    Action, Deadline, Definition, ExtractedEntity, Priority, Requirement, Section,
    SectionEntities, NOT_SPECIFIED,
};

const MAX_DEFINITIONS: usize = 10;
const MAX_REQUIREMENTS: usize = 15;
const MAX_ACTIONS: usize = 12;
const MAX_DEADLINES: usize = 8;

const MAX_TERM_WORDS: usize = 6;
const MAX_PARTY_WORDS: usize = 8;

const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "no", "sec", "inc", "ltd", "co", "mr", "ms", "dr", "st", "vs", "art",
    "para", "pp", "ch",
];

const MONTH: &str =
    "(?:January|February|March|April|May|June|July|August|September|October|November|December)";

/// Compiled patterns. Build once and share; extraction itself holds no state.
pub struct StructuredExtractor {
    enumerator_re: Regex,
    preamble_re: Regex,
    definition_re: Regex,
    modal_re: Regex,
    high_priority_re: Regex,
    responsible_re: Regex,
    action_re: Regex,
    deadline_re: Regex,
    consequence_re: Regex,
}

impl Default for StructuredExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredExtractor {
    pub fn new() -> Self {
        let date = format!(
            r"{MONTH}\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}|\d{{1,2}}/\d{{1,2}}/\d{{2,4}}|\d{{4}}-\d{{2}}-\d{{2}}"
        );
        let period = r"(?:\d+|one|two|three|four|five|six|seven|eight|nine|ten|fourteen|fifteen|thirty|forty-five|sixty|ninety)\s+(?:\(\d+\)\s+)?(?:calendar\s+|business\s+|working\s+)?(?:days?|weeks?|months?|years?)";
        let deadline = format!(
            r"(?i)\b(?P<cue>no\s+later\s+than|not\s+later\s+than|on\s+or\s+before|prior\s+to|effective(?:\s+on)?|by|before|within|until)\s+(?:(?P<date>{date})|(?P<period>{period}))"
        );

        Self {
            enumerator_re: Regex::new(
                r"^\s*(?:\(?\d{1,3}[.)]|\(?[A-Za-z][.)]|\([ivxlcIVXLC]{1,5}\)|[-*•])\s+",
            )
            .expect("valid regex"),
            preamble_re: Regex::new(
                r"(?i)^(?:for\s+(?:the\s+)?purposes?\s+of\s+this\s+\w+[^,]*|in\s+this\s+\w+|as\s+used\s+in\s+this\s+\w+)\s*,\s*",
            )
            .expect("valid regex"),
            definition_re: Regex::new(
                r#"(?i)^(?:the\s+(?:term|phrase)\s+)?["“']?(?P<term>[a-z][a-z0-9 /'\-]{0,60}?)["”']?,?\s+(?:means|shall\s+mean|is\s+defined\s+as|refers\s+to|has\s+the\s+meaning)\s+(?P<definition>.+)$"#,
            )
            .expect("valid regex"),
            modal_re: Regex::new(
                r"(?i)\b(?:shall\s+not|must\s+not|may\s+not|shall|must|(?:is|are)\s+required\s+to|(?:is|are)\s+obligated\s+to|mandatory|should)\b",
            )
            .expect("valid regex"),
            high_priority_re: Regex::new(
                r"(?i)\b(?:shall\s+not|must\s+not|may\s+not|prohibited|mandatory|immediately|at\s+all\s+times|strictly|under\s+no\s+circumstances)\b",
            )
            .expect("valid regex"),
            responsible_re: Regex::new(
                r"(?i)^(?P<party>.+?)\s+(?:is|are|shall\s+be|will\s+be)\s+responsible\s+for\s+(?P<action>.+)$",
            )
            .expect("valid regex"),
            action_re: Regex::new(
                r"(?i)^(?P<party>.+?)\s+(?:shall|must|will)\s+(?P<action>(?:submit|provide|establish|notify|review|report|develop|implement|maintain|conduct|publish|ensure|prepare|designate|issue|complete|file|certify|update|train|monitor|post|deliver|approve|adopt|create|retain|document|assess|evaluate)\b.*)$",
            )
            .expect("valid regex"),
            deadline_re: Regex::new(&deadline).expect("valid regex"),
            consequence_re: Regex::new(
                r"(?i)\b(?:failure\s+to|otherwise|penalt(?:y|ies)|subject\s+to|(?:will|shall|may)\s+result\s+in|forfeit)",
            )
            .expect("valid regex"),
        }
    }

    /// All entities found in the section, definitions first.
    pub fn extract(&self, section: &Section) -> Vec<ExtractedEntity> {
        self.extract_grouped(section).into_entities()
    }

    pub fn extract_grouped(&self, section: &Section) -> SectionEntities {
        self.extract_text(&section.raw_text)
    }

    pub fn extract_text(&self, text: &str) -> SectionEntities {
        let sentences: Vec<String> = split_sentences(text)
            .into_iter()
            .map(|s| self.enumerator_re.replace(&s, "").trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut entities = SectionEntities::default();
        for (i, sentence) in sentences.iter().enumerate() {
            let body = strip_terminator(sentence);

            if let Some(definition) = self.definition(body) {
                if !entities.definitions.iter().any(|d| d.key() == definition.key()) {
                    entities.definitions.push(definition);
                }
                continue;
            }

            if let Some(requirement) = self.requirement(body) {
                entities.requirements.push(requirement);
            }

            let deadlines = self.deadlines(body, sentences.get(i + 1).map(String::as_str));
            if let Some(action) = self.action(body, deadlines.first()) {
                entities.actions.push(action);
            }
            entities.deadlines.extend(deadlines);
        }

        entities.definitions.truncate(MAX_DEFINITIONS);
        entities.requirements.truncate(MAX_REQUIREMENTS);
        entities.actions.truncate(MAX_ACTIONS);
        entities.deadlines.truncate(MAX_DEADLINES);
        entities
    }

    fn definition(&self, sentence: &str) -> Option<Definition> {
        let sentence = self.preamble_re.replace(sentence, "");
        let caps = self.definition_re.captures(&sentence)?;
        let term = caps["term"].trim().trim_matches(|c| c == '"' || c == '\'').trim();
        let definition = caps["definition"].trim();
        let word_count = term.split_whitespace().count();
        if term.is_empty() || definition.is_empty() || word_count > MAX_TERM_WORDS {
            return None;
        }
        if self.modal_re.is_match(term) {
            return None;
        }
        Some(Definition {
            term: term.to_string(),
            definition: definition.to_string(),
        })
    }

    fn requirement(&self, sentence: &str) -> Option<Requirement> {
        let modal = self.modal_re.find(sentence)?;
        let priority = if self.high_priority_re.is_match(sentence) {
            Priority::High
        } else if modal.as_str().eq_ignore_ascii_case("should") {
            Priority::Low
        } else {
            Priority::Medium
        };
        let applies_to = subject_phrase(&sentence[..modal.start()])
            .unwrap_or_else(|| "All parties".to_string());
        Some(Requirement {
            requirement: sentence.to_string(),
            priority,
            applies_to,
        })
    }

    fn action(&self, sentence: &str, deadline: Option<&Deadline>) -> Option<Action> {
        let caps = self
            .responsible_re
            .captures(sentence)
            .or_else(|| self.action_re.captures(sentence))?;
        let responsible_party = subject_phrase(&caps["party"])?;
        let action = caps["action"].trim();
        if action.is_empty() {
            return None;
        }
        Some(Action {
            action: action.to_string(),
            responsible_party,
            timeline: deadline
                .map(|d| d.deadline.clone())
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        })
    }

    fn deadlines(&self, sentence: &str, next_sentence: Option<&str>) -> Vec<Deadline> {
        let mut out = Vec::new();
        for caps in self.deadline_re.captures_iter(sentence) {
            let deadline = match (caps.name("date"), caps.get(0)) {
                (Some(date), _) => date.as_str().to_string(),
                (None, Some(whole)) => whole.as_str().to_string(),
                (None, None) => continue,
            };
            out.push(Deadline {
                deadline,
                description: sentence.to_string(),
                consequence: self.consequence(sentence, next_sentence),
            });
        }
        out
    }

    fn consequence(&self, sentence: &str, next_sentence: Option<&str>) -> String {
        if let Some(m) = self.consequence_re.find(sentence) {
            return sentence[m.start()..].trim().to_string();
        }
        match next_sentence {
            Some(next) if self.consequence_re.is_match(next) => strip_terminator(next).to_string(),
            _ => NOT_SPECIFIED.to_string(),
        }
    }
}

/// Split text into sentences: paragraphs on blank lines, then on `.`, `!`, `?`, `;`
/// followed by whitespace. Common abbreviations and initials do not end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in text.split("\n\n") {
        let joined = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<(usize, char)> = joined.char_indices().collect();
        let mut start = 0;
        for (pos, &(byte_idx, c)) in chars.iter().enumerate() {
            if !matches!(c, '.' | '!' | '?' | ';') {
                continue;
            }
            let at_boundary = chars.get(pos + 1).map_or(true, |&(_, next)| next == ' ');
            if !at_boundary || (c == '.' && is_abbreviation(&joined[start..byte_idx])) {
                continue;
            }
            let end = byte_idx + c.len_utf8();
            let sentence = joined[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence.to_string());
            }
            start = end;
        }
        let rest = joined[start..].trim();
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
    out
}

fn is_abbreviation(before_dot: &str) -> bool {
    let word = before_dot
        .rsplit(' ')
        .next()
        .unwrap_or("")
        .trim_start_matches(['(', '"', '\'']);
    if word.is_empty() {
        return false;
    }
    if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
        return true;
    }
    if word.contains('.') {
        return true;
    }
    let lower = word.to_ascii_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

fn strip_terminator(sentence: &str) -> &str {
    sentence.trim().trim_end_matches(['.', ';', '!', '?']).trim_end()
}

/// The grammatical subject preceding a modal: the clause after the last comma, capped to
/// a few words.
fn subject_phrase(prefix: &str) -> Option<String> {
    let clause = prefix.rsplit(',').next().unwrap_or(prefix).trim();
    if clause.is_empty() {
        return None;
    }
    let words: Vec<&str> = clause.split_whitespace().collect();
    let words = if words.len() > MAX_PARTY_WORDS {
        &words[words.len() - 6..]
    } else {
        &words[..]
    };
    Some(words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> SectionEntities {
        StructuredExtractor::new().extract_text(text)
    }

    #[test]
    fn deadline_with_calendar_date() {
        let e = extract("Each agency shall submit a report by March 1, 2025.");
        assert_eq!(e.deadlines.len(), 1);
        let d = &e.deadlines[0];
        assert!(d.deadline.contains("March 1, 2025"));
        assert!(!d.description.is_empty());
        assert_eq!(d.consequence, NOT_SPECIFIED);
    }

    #[test]
    fn requirement_and_action_from_the_same_sentence() {
        let e = extract("Each agency shall submit a report by March 1, 2025.");
        assert_eq!(e.requirements.len(), 1);
        assert_eq!(e.requirements[0].applies_to, "Each agency");
        assert_eq!(e.requirements[0].priority, Priority::Medium);

        assert_eq!(e.actions.len(), 1);
        let a = &e.actions[0];
        assert_eq!(a.responsible_party, "Each agency");
        assert!(a.action.starts_with("submit a report"));
        assert_eq!(a.timeline, "March 1, 2025");
    }

    #[test]
    fn definition_with_means() {
        let e = extract("Agency means any department of the state government and includes contractors.");
        assert_eq!(e.definitions.len(), 1);
        assert_eq!(e.definitions[0].term, "Agency");
        assert_eq!(
            e.definitions[0].definition,
            "any department of the state government and includes contractors"
        );
        assert!(e.requirements.is_empty());
    }

    #[test]
    fn definition_with_preamble_and_quotes() {
        let e = extract(r#"For purposes of this policy, the term "Covered Entity" means a contractor or grantee."#);
        assert_eq!(e.definitions.len(), 1);
        assert_eq!(e.definitions[0].term, "Covered Entity");
        assert_eq!(e.definitions[0].key(), "covered entity");
    }

    #[test]
    fn shall_mean_is_a_definition_not_a_requirement() {
        let e = extract("Record shall mean any document created by staff.");
        assert_eq!(e.definitions.len(), 1);
        assert_eq!(e.definitions[0].term, "Record");
        assert!(e.requirements.is_empty());
    }

    #[test]
    fn duplicate_terms_keep_first_definition() {
        let e = extract("Agency means a department. agency means something else.");
        assert_eq!(e.definitions.len(), 1);
        assert_eq!(e.definitions[0].definition, "a department");
    }

    #[test]
    fn prohibition_is_high_priority() {
        let e = extract("Contractors must not disclose personal records.");
        assert_eq!(e.requirements.len(), 1);
        assert_eq!(e.requirements[0].priority, Priority::High);
        assert_eq!(e.requirements[0].applies_to, "Contractors");
    }

    #[test]
    fn should_is_low_priority() {
        let e = extract("Staff should review the guidance annually.");
        assert_eq!(e.requirements[0].priority, Priority::Low);
    }

    #[test]
    fn subject_after_leading_clause() {
        let e = extract("Not later than 30 days after enactment, each agency shall designate a privacy officer.");
        assert_eq!(e.requirements[0].applies_to, "each agency");
        assert_eq!(e.actions[0].responsible_party, "each agency");
        assert_eq!(e.actions[0].action, "designate a privacy officer");
        assert_eq!(e.deadlines[0].deadline, "Not later than 30 days");
    }

    #[test]
    fn responsible_for_action() {
        let e = extract("The Records Officer is responsible for maintaining the archive.");
        assert_eq!(e.actions.len(), 1);
        assert_eq!(e.actions[0].responsible_party, "The Records Officer");
        assert_eq!(e.actions[0].action, "maintaining the archive");
        assert_eq!(e.actions[0].timeline, NOT_SPECIFIED);
    }

    #[test]
    fn consequence_from_following_sentence() {
        let e = extract("Reports must be filed within 30 days. Failure to file will result in a penalty.");
        assert_eq!(e.deadlines.len(), 1);
        assert_eq!(e.deadlines[0].deadline, "within 30 days");
        assert_eq!(e.deadlines[0].consequence, "Failure to file will result in a penalty");
    }

    #[test]
    fn no_cues_yield_nothing() {
        let e = extract("This section is informational and describes the history of the program.");
        assert!(e.is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn enumerators_are_stripped() {
        let e = extract("(a) The agency shall publish a notice.\n\n(b) Grantees must retain receipts.");
        assert_eq!(e.requirements.len(), 2);
        assert_eq!(e.requirements[0].applies_to, "The agency");
        assert_eq!(e.requirements[1].applies_to, "Grantees");
    }

    #[test]
    fn sentence_split_respects_abbreviations() {
        let sentences = split_sentences("Funds under the U.S. Code apply, e.g. grants. Next sentence here.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].ends_with("grants."));
    }

    #[test]
    fn sentence_split_joins_wrapped_lines() {
        let sentences = split_sentences("Each agency shall\nsubmit a report.\n\nSecond paragraph");
        assert_eq!(sentences, vec!["Each agency shall submit a report.", "Second paragraph"]);
    }

    #[test]
    fn extract_flattens_in_type_order() {
        let section = Section::new(
            0,
            Some("Duties"),
            "Agency means a department. The agency shall publish a notice by June 30, 2026.",
        );
        let entities = StructuredExtractor::new().extract(&section);
        assert!(matches!(entities[0], ExtractedEntity::Definition(_)));
        assert!(entities.iter().any(|e| matches!(e, ExtractedEntity::Deadline(_))));
    }
}
