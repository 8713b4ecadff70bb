/// Fixed reply when the documents hold nothing to answer from.
pub const NOT_SPECIFIED: &str = "Not specified in your documents.";

const INSTRUCTIONS: &str = "You answer questions about the user's own documents. \
Use only the evidence below. Quote amounts, dates and identifiers exactly as written. \
If the evidence does not contain the answer, reply exactly: ";

/// Builds the single prompt sent to the generation service.
pub fn compose_prompt(question: &str, evidence: &str) -> String {
    format!(
        "{INSTRUCTIONS}{NOT_SPECIFIED}\n\nEvidence:\n{}\n\nQuestion: {}\nAnswer:",
        evidence.trim(),
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_evidence_question_and_refusal() {
        let evidence = "Document: Invoice\nTotal due: 450 EUR\n";
        let p = compose_prompt("  What is the total due? ", evidence);
        assert!(p.contains(NOT_SPECIFIED));
        assert!(p.contains("Evidence:\nDocument: Invoice\nTotal due: 450 EUR\n\nQuestion:"));
        assert!(p.ends_with("\n\nQuestion: What is the total due?\nAnswer:"));
    }
}
