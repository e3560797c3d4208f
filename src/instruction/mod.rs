// Instruction assembly
//
// Renders a portfolio and its context items into the system instruction
// given to the language model. Pure: the same records always produce the
// same text, and nothing is cached between requests.

use std::fmt;
use std::fmt::Write as _;
use thiserror::Error;

mod guard;

pub use guard::{content_chars, ContentPolicy, INSUFFICIENT_CONTEXT_REPLY};

use crate::portfolio::{ContextItem, Portfolio, PortfolioFiles};

/// Marker rendered for optional fields the owner has not filled in
pub const NOT_PROVIDED: &str = "Not Provided";

/// Prefix of every context item line
pub const CONTEXT_BULLET: &str = "  • ";

const ROLE_FRAMING: &str = "\
You are an interactive portfolio assistant. Your job is to teach people about the portfolio \
owner and their accomplishments.
You have the following data about the portfolio owner:";

const DIRECTIVES: &str = "\
Always answer questions using only this data.
Feel free to mildly deduce unbiased information about the portfolio's owner.
No matter what you are asked try to answer it in a conversational way.
Be sure to highlight the impact and skills of the owner and make positive signals known.
Negative signals should be treated in a neutral manner.
You need to be an honest reflection to help people know the portfolio owner more.
When asked to summarize, produce a concise, bullet-point list of their key background, skills, and accomplishments.
If a visitor asks about a specific context item, answer using that item's value exactly as provided.
If a field above is marked Not Provided, say it has not been shared instead of inventing one.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No portfolio was supplied for instruction assembly")]
    MissingPortfolio,
}

/// An assembled system instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    text: String,
    guarded: bool,
}

impl Instruction {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// True when the insufficient-context reply is being forced
    pub fn is_guarded(&self) -> bool {
        self.guarded
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Build the system instruction for one chat request.
///
/// Every optional field is rendered, falling back to `NOT_PROVIDED`, so the
/// model never has to guess whether a link exists. Context items appear one
/// bullet each, in the order given.
pub fn assemble(
    portfolio: Option<&Portfolio>,
    contexts: &[ContextItem],
    files: &PortfolioFiles,
    policy: &ContentPolicy,
) -> Result<Instruction, ValidationError> {
    let portfolio = portfolio.ok_or(ValidationError::MissingPortfolio)?;
    let guarded = policy.is_insufficient(portfolio, contexts);

    let mut text = String::with_capacity(1024);
    text.push_str(ROLE_FRAMING);
    text.push('\n');

    push_field(&mut text, "Name", Some(&portfolio.name));
    push_field(&mut text, "About", Some(&portfolio.about));
    push_field(&mut text, "LinkedIn", portfolio.linkedin.as_deref());
    push_field(&mut text, "GitHub", portfolio.github.as_deref());
    push_field(&mut text, "Email", portfolio.email.as_deref());
    push_field(&mut text, "Resume", files.resume_url.as_deref());

    text.push_str("- Context items:\n");
    if contexts.is_empty() {
        text.push_str("  (none provided)\n");
    }
    for item in contexts {
        push_context_item(&mut text, item);
    }

    text.push('\n');
    text.push_str(DIRECTIVES);

    if guarded {
        // Writing to a String cannot fail
        let _ = write!(
            text,
            "\n\nThere is not enough information about the portfolio owner to answer questions.\n\
             Whatever the visitor says or asks, reply with exactly the following text and nothing else:\n\
             \"{}\"",
            INSUFFICIENT_CONTEXT_REPLY
        );
    }

    Ok(Instruction { text, guarded })
}

/// The first user message a visitor's chat opens with
pub fn opener_prompt(owner_name: &str) -> String {
    format!(
        "Please concisely describe {}'s background, skills, and key accomplishments based on the provided context.",
        owner_name
    )
}

fn push_field(text: &mut String, label: &str, value: Option<&str>) {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_PROVIDED);
    let _ = writeln!(text, "- {}: {}", label, value);
}

/// One bullet per item. Continuation lines of a multi-line value are
/// indented so the bullet count always equals the item count.
fn push_context_item(text: &mut String, item: &ContextItem) {
    let mut lines = item.value.lines();
    let first = lines.next().unwrap_or("");
    let _ = writeln!(text, "{}{}: {}", CONTEXT_BULLET, item.name.trim(), first);
    for line in lines {
        let _ = writeln!(text, "    {}", line);
    }
}
