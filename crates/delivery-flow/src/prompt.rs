use crate::errors::TriggerError;

/// `"{template} {selection}"` with the selection trimmed. An empty template
/// yields the selection alone.
pub fn compose_prompt(template: &str, selection: &str) -> Result<String, TriggerError> {
    let selection = selection.trim();
    if selection.is_empty() {
        return Err(TriggerError::EmptySelection);
    }
    let template = template.trim_end();
    if template.is_empty() {
        return Ok(selection.to_string());
    }
    Ok(format!("{template} {selection}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_and_selection_are_joined() {
        assert_eq!(
            compose_prompt("Fit Match:", "  Senior Engineer role at Acme\n").unwrap(),
            "Fit Match: Senior Engineer role at Acme"
        );
    }

    #[test]
    fn empty_template_passes_selection_through() {
        assert_eq!(compose_prompt("", "text").unwrap(), "text");
    }

    #[test]
    fn blank_selection_is_rejected() {
        assert_eq!(compose_prompt("Fit Match:", " \t"), Err(TriggerError::EmptySelection));
    }
}
