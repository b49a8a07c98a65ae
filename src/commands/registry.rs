//! Command registry
//!
//! Centralized registry for all available commands.

use super::{admin, counter, hash, key, string, ttl, Command};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all available commands
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new command registry and register all commands
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        // String commands
        registry.register(Arc::new(string::SetCommand));
        registry.register(Arc::new(string::GetCommand));

        // Key commands
        registry.register(Arc::new(key::DelCommand));
        registry.register(Arc::new(key::ExistsCommand));

        // TTL commands
        registry.register(Arc::new(ttl::ExpireCommand));
        registry.register(Arc::new(ttl::PExpireAtCommand));
        registry.register(Arc::new(ttl::TtlCommand));

        // Counter commands
        registry.register(Arc::new(counter::IncrCommand));
        registry.register(Arc::new(counter::IncrByCommand));
        registry.register(Arc::new(counter::DecrCommand));
        registry.register(Arc::new(counter::DecrByCommand));

        // Hash commands
        registry.register(Arc::new(hash::HSetCommand));
        registry.register(Arc::new(hash::HGetCommand));
        registry.register(Arc::new(hash::HDelCommand));
        registry.register(Arc::new(hash::HGetAllCommand));

        // Admin commands
        registry.register(Arc::new(admin::PingCommand));
        registry.register(Arc::new(admin::InfoCommand));
        registry.register(Arc::new(admin::FlushDbCommand));
        registry.register(Arc::new(admin::RewriteAofCommand));

        registry
    }

    /// Register a command
    fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_uppercase();
        self.commands.insert(name, command);
    }

    /// Get a command by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_uppercase()).cloned()
    }

    /// Check if a command exists
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_uppercase())
    }

    /// Get all command names
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CommandRegistry::new();
        assert!(registry.has_command("set"));
        assert!(registry.has_command("PExpireAt"));
        assert!(registry.get("nosuchcommand").is_none());
        assert_eq!(registry.command_names().len(), 19);
    }
}
