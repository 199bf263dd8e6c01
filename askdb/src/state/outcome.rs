//! Tagged stage outcomes. Stages parse collaborator text once, here, and the
//! graph routes on the resulting variants.

/// Intent of the latest user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Chitchat,
    DatabaseQuestion,
}

impl Intent {
    /// Parses a classifier label; `None` for anything unrecognised.
    pub fn parse(label: &str) -> Option<Self> {
        let word = first_word(label);
        match word.as_str() {
            "greeting" | "greet" | "hello" => Some(Intent::Greeting),
            "chitchat" | "chit-chat" | "smalltalk" | "small-talk" => Some(Intent::Chitchat),
            "database" | "database-question" | "db" | "db-question" | "question" => {
                Some(Intent::DatabaseQuestion)
            }
            _ => None,
        }
    }
}

/// Whether a request can be answered from the configured schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    InDomain,
    OutOfDomain,
}

impl Relevance {
    pub fn parse(label: &str) -> Option<Self> {
        match first_word(label).as_str() {
            "relevant" | "yes" | "in-domain" | "in_domain" => Some(Relevance::InDomain),
            "irrelevant" | "no" | "out-of-domain" | "out_of_domain" => {
                Some(Relevance::OutOfDomain)
            }
            _ => None,
        }
    }
}

/// Result of the validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The request is unambiguous; `instruction` is its restatement.
    Accepted { instruction: String },
    /// The model asked a clarifying question.
    NeedsClarification { question: String },
    /// The user stopped the dialogue.
    Cancelled,
    /// The collaborator failed or answered with an empty acceptance.
    Failed { reason: String },
}

impl ValidationOutcome {
    /// Parses a validation reply with the accepted-marker prefix contract.
    ///
    /// `"<marker>[:] <instruction>"` on the first line, or the marker alone on
    /// the first line followed by the instruction on the next lines, is an
    /// acceptance. Matching is case-insensitive and the marker must end at a
    /// word boundary (`"okay"` is not `"ok"`). Anything else is a question.
    pub fn parse(reply: &str, marker: &str) -> Self {
        let reply = reply.trim();
        if reply.is_empty() {
            return ValidationOutcome::Failed {
                reason: "empty validation reply".to_string(),
            };
        }
        let (first, rest) = match reply.split_once('\n') {
            Some((f, r)) => (f.trim(), r.trim()),
            None => (reply, ""),
        };
        let Some(after) = strip_marker(first, marker) else {
            return ValidationOutcome::NeedsClarification {
                question: reply.to_string(),
            };
        };
        let after = after
            .trim_start_matches(|c: char| c == ':' || c == '-' || c == ',' || c.is_whitespace())
            .trim();
        let instruction = match (after.is_empty(), rest.is_empty()) {
            (true, true) => {
                return ValidationOutcome::Failed {
                    reason: "accepted without an instruction".to_string(),
                }
            }
            (true, false) => rest.to_string(),
            (false, true) => after.to_string(),
            (false, false) => format!("{}\n{}", after, rest),
        };
        ValidationOutcome::Accepted { instruction }
    }
}

fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let marker = marker.trim();
    if marker.is_empty() || line.len() < marker.len() || !line.is_char_boundary(marker.len()) {
        return None;
    }
    let (head, tail) = line.split_at(marker.len());
    if !head.eq_ignore_ascii_case(marker) {
        return None;
    }
    match tail.chars().next() {
        None => Some(tail),
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        Some(_) => Some(tail),
    }
}

/// Result of SQL drafting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated { sql: String },
    Failed { reason: String },
}

impl GenerationOutcome {
    /// Strips code fences from a drafting reply; empty output is a failure.
    pub fn from_reply(reply: &str) -> Self {
        let sql = strip_code_fence(reply);
        if sql.is_empty() {
            GenerationOutcome::Failed {
                reason: "empty SQL draft".to_string(),
            }
        } else {
            GenerationOutcome::Generated { sql }
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Generated { sql } => Some(sql),
            GenerationOutcome::Failed { .. } => None,
        }
    }
}

/// Removes a surrounding ```` ```lang ... ``` ```` fence, or extracts the first
/// fenced block when the reply has prose around it.
pub fn strip_code_fence(reply: &str) -> String {
    let text = reply.trim();
    let Some(start) = text.find("```") else {
        return text.to_string();
    };
    let after_open = &text[start + 3..];
    let body = match after_open.find('\n') {
        Some(nl) if after_open[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_open[nl + 1..]
        }
        _ => after_open,
    };
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim().to_string()
}

/// Why the turn ends with a plain reply instead of SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    Chitchat,
    OutOfDomain,
    ValidationFailed(String),
}

fn first_word(label: &str) -> String {
    label
        .trim()
        .split(|c: char| c.is_whitespace() || c == '.' || c == ',' || c == ':' || c == '"')
        .find(|w| !w.is_empty())
        .unwrap_or("")
        .to_lowercase()
}
