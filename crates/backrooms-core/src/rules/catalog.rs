use super::{
    hallway, literal, numeric, registers, stack_ops, thread, uncommon, Rule, RuleError, Shifter,
};

/// The default root opcode table.
///
/// # Errors
///
/// Returns a [`RuleError`] if two built-in rules claim the same character,
/// which would be a bug in this module.
pub fn built_in_rules() -> Result<Vec<Box<dyn Rule>>, RuleError> {
    let mut rules: Vec<Box<dyn Rule>> = Shifter::all()
        .into_iter()
        .map(|shifter| Box::new(shifter) as Box<dyn Rule>)
        .collect();
    rules.extend(stack_ops::rules());
    rules.push(Box::new(literal::module()?));
    rules.push(Box::new(numeric::integer_module()?));
    rules.push(Box::new(numeric::text_module()?));
    rules.push(Box::new(registers::frame_module()?));
    rules.push(Box::new(registers::keep_module()?));
    rules.push(Box::new(registers::load_module()?));
    rules.push(Box::new(hallway::module()?));
    rules.push(Box::new(thread::module()?));
    rules.push(Box::new(uncommon::module()?));
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::built_in_rules;
    use crate::rules::{RuleTable, SHIFTERS};

    #[test]
    fn built_in_table_has_no_collisions() {
        let table = RuleTable::new(built_in_rules().unwrap()).unwrap();
        assert_eq!(
            table.start_characters().collect::<String>(),
            "!123456789<=>CEFINPSVXZ^cdefhiklprtyz{}~"
        );
    }

    #[test]
    fn every_shifter_is_registered() {
        let table = RuleTable::new(built_in_rules().unwrap()).unwrap();
        for shifter in SHIFTERS {
            assert!(table.get(shifter).is_some(), "{shifter} missing");
        }
        assert!(table.get(' ').is_none());
    }
}
