use anyhow::Result;

use crate::thelia::list_messages;
use crate::thelia::messages::FieldDefinition;

fn field_list(fields: &[FieldDefinition]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.unit.is_empty() {
                f.name.to_string()
            } else {
                format!("{} [{}]", f.name, f.unit)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// List the message types the decoder knows about
pub fn messages() -> Result<()> {
    for def in list_messages() {
        println!("{}  {:18} {}", def.command_hex(), def.name, def.description);
        if !def.fields.is_empty() {
            println!("      query:    {}", field_list(&def.fields));
        }
        if !def.response_fields.is_empty() {
            println!("      response: {}", field_list(&def.response_fields));
        }
    }
    Ok(())
}
