//! Output rendering and formatting

use comfy_table::{
    presets::{NOTHING, UTF8_FULL},
    Attribute, Cell, Color, ContentArrangement, Table,
};
use lockyard_types::{Grant, OutputFormat, Resource, ResourceStatus};
use serde::Serialize;
use std::io;

/// Result of a command, rendered as a table or as JSON
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    Resources { resources: Vec<Resource> },
    Matches {
        expression: String,
        free: usize,
        resources: Vec<Resource>,
    },
    Capabilities { capabilities: Vec<String> },
    Granted { grant: Grant },
    Released { resources: Vec<String> },
    Plan { resources: Vec<String> },
    Success { message: String },
}

/// Output renderer for CLI results
#[derive(Clone, Copy)]
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, output: &CommandOutput) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match output {
            CommandOutput::Resources { resources } => self.render_resources(resources),
            CommandOutput::Matches {
                expression,
                free,
                resources,
            } => {
                println!(
                    "{} resource(s) match '{expression}', {free} free",
                    resources.len()
                );
                if !resources.is_empty() {
                    self.render_resources(resources);
                }
            }
            CommandOutput::Capabilities { capabilities } => {
                if capabilities.is_empty() {
                    println!("No capabilities defined.");
                }
                for tag in capabilities {
                    println!("{tag}");
                }
            }
            CommandOutput::Granted { grant } => {
                println!("Locked [{}] for {}", grant.resources.join(", "), grant.requester);
                if let Some(binding) = &grant.variable {
                    println!("{}={}", binding.name, binding.value);
                }
            }
            CommandOutput::Released { resources } => {
                if resources.is_empty() {
                    println!("Nothing to release.");
                } else {
                    println!("Released [{}]", resources.join(", "));
                }
            }
            CommandOutput::Plan { resources } => {
                println!("Would lock [{}]", resources.join(", "));
            }
            CommandOutput::Success { message } => println!("{message}"),
        }
        Ok(())
    }

    fn render_resources(&self, resources: &[Resource]) {
        if resources.is_empty() {
            println!("No resources registered.");
            return;
        }

        let mut table = Table::new();
        let preset = if self.format == OutputFormat::Plain {
            NOTHING
        } else {
            UTF8_FULL
        };
        table
            .load_preset(preset)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Resource").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Held by").add_attribute(Attribute::Bold),
            Cell::new("Capabilities").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

        for resource in resources {
            let capabilities: Vec<&str> =
                resource.capabilities.iter().map(String::as_str).collect();
            table.add_row(vec![
                Cell::new(&resource.name),
                self.status_cell(resource.status()),
                Cell::new(holder(resource).unwrap_or_else(|| "-".to_string())),
                Cell::new(capabilities.join(" ")),
                Cell::new(resource.description.as_deref().unwrap_or("-")),
            ]);
        }

        println!("{table}");
    }

    fn status_cell(&self, status: ResourceStatus) -> Cell {
        let cell = Cell::new(status.to_string());
        if self.format == OutputFormat::Plain {
            return cell;
        }
        match status {
            ResourceStatus::Free => cell.fg(Color::Green),
            ResourceStatus::Locked => cell.fg(Color::Yellow),
            ResourceStatus::Reserved => cell.fg(Color::Red),
            ResourceStatus::Claimed => cell.fg(Color::Cyan),
        }
    }
}

/// Whoever keeps the resource from being free
fn holder(resource: &Resource) -> Option<String> {
    if let Some(by) = &resource.reserved_by {
        return Some(by.clone());
    }
    if let Some(owner) = &resource.owner {
        return Some(owner.to_string());
    }
    resource.pending_claim.as_ref().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lockyard_types::{PendingClaim, Requester};

    #[test]
    fn holder_prefers_reservation() {
        let mut resource = Resource::new("r1");
        assert_eq!(holder(&resource), None);

        resource.claim(PendingClaim::new("nightly", 4));
        assert_eq!(holder(&resource).as_deref(), Some("nightly#4"));

        resource.lock(Requester::new("nightly#12", Utc::now()));
        resource.reserve("alice");
        assert_eq!(holder(&resource).as_deref(), Some("alice"));
    }

    #[test]
    fn json_output_is_tagged() {
        let output = CommandOutput::Released {
            resources: vec!["r1".into()],
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "released");
        assert_eq!(json["resources"][0], "r1");
    }
}
