//! Typed scripting variables and their values.

use std::collections::BTreeMap;

use crate::foundation::error::{MiravaError, MiravaResult};

/// Type of an interop variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VarType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
}

#[derive(Clone, Debug, PartialEq)]
enum VarValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
}

impl VarValue {
    fn var_type(&self) -> VarType {
        match self {
            VarValue::Bool(_) => VarType::Bool,
            VarValue::Int(_) => VarType::Int,
            VarValue::Double(_) => VarType::Double,
            VarValue::Str(_) => VarType::String,
        }
    }
}

type Scope = BTreeMap<String, VarValue>;

/// Typed key/value store scoped globally or per effect slot.
///
/// Scoping rules when `slot` is omitted: lookups search the global scope
/// first, then slot scopes in the order the slots were first registered.
/// This tie-break is deliberate and stable: if the same name exists in
/// several scopes, the earliest-registered one always wins. Writes with an
/// omitted slot overwrite the variable wherever lookup finds it, and create
/// in the global scope otherwise.
#[derive(Default)]
pub struct VarStore {
    global: Scope,
    /// Slot scopes in registration order.
    slots: Vec<(String, Scope)>,
}

impl VarStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `slot`'s scope exist, preserving first-registration order.
    pub(crate) fn register_slot(&mut self, slot: &str) {
        if !self.slots.iter().any(|(name, _)| name == slot) {
            self.slots.push((slot.to_string(), Scope::new()));
        }
    }

    /// Drop `slot`'s scope and all variables in it. Called when the slot's
    /// effect is cleared.
    pub(crate) fn drop_slot(&mut self, slot: &str) {
        self.slots.retain(|(name, _)| name != slot);
    }

    /// True if a variable with this name exists in the requested scope.
    pub fn has_var(&self, name: &str, slot: Option<&str>) -> bool {
        self.find(name, slot).is_some()
    }

    /// The type of the variable, or `None` if it does not exist.
    pub fn var_type(&self, name: &str, slot: Option<&str>) -> Option<VarType> {
        self.find(name, slot).map(VarValue::var_type)
    }

    /// Get a boolean variable.
    pub fn get_bool_var(&self, name: &str, slot: Option<&str>) -> MiravaResult<bool> {
        match self.lookup(name, slot)? {
            VarValue::Bool(v) => Ok(*v),
            other => Err(mismatch(name, VarType::Bool, other.var_type())),
        }
    }

    /// Get an integer variable.
    pub fn get_int_var(&self, name: &str, slot: Option<&str>) -> MiravaResult<i32> {
        match self.lookup(name, slot)? {
            VarValue::Int(v) => Ok(*v),
            other => Err(mismatch(name, VarType::Int, other.var_type())),
        }
    }

    /// Get a double variable.
    pub fn get_double_var(&self, name: &str, slot: Option<&str>) -> MiravaResult<f64> {
        match self.lookup(name, slot)? {
            VarValue::Double(v) => Ok(*v),
            other => Err(mismatch(name, VarType::Double, other.var_type())),
        }
    }

    /// Get a string variable.
    pub fn get_string_var(&self, name: &str, slot: Option<&str>) -> MiravaResult<String> {
        match self.lookup(name, slot)? {
            VarValue::Str(v) => Ok(v.clone()),
            other => Err(mismatch(name, VarType::String, other.var_type())),
        }
    }

    /// Set a boolean variable. Returns `true` if the variable was created,
    /// `false` if an existing one was overwritten.
    pub fn set_bool_var(&mut self, name: &str, value: bool, slot: Option<&str>) -> bool {
        self.set(name, VarValue::Bool(value), slot)
    }

    /// Set an integer variable. Returns `true` if the variable was created.
    pub fn set_int_var(&mut self, name: &str, value: i32, slot: Option<&str>) -> bool {
        self.set(name, VarValue::Int(value), slot)
    }

    /// Set a double variable. Returns `true` if the variable was created.
    pub fn set_double_var(&mut self, name: &str, value: f64, slot: Option<&str>) -> bool {
        self.set(name, VarValue::Double(value), slot)
    }

    /// Set a string variable. Returns `true` if the variable was created.
    pub fn set_string_var(&mut self, name: &str, value: impl Into<String>, slot: Option<&str>) -> bool {
        self.set(name, VarValue::Str(value.into()), slot)
    }

    /// Delete a variable. Returns `true` iff one was removed.
    pub fn delete_var(&mut self, name: &str, slot: Option<&str>) -> bool {
        match slot {
            Some(slot) => self
                .slot_scope_mut(slot)
                .is_some_and(|scope| scope.remove(name).is_some()),
            None => {
                if self.global.remove(name).is_some() {
                    return true;
                }
                self.slots
                    .iter_mut()
                    .any(|(_, scope)| scope.remove(name).is_some())
            }
        }
    }

    /// Remove all variables in `slot`, or everywhere if `slot` is omitted.
    /// Returns `true` iff at least one variable was removed.
    pub fn clear_vars(&mut self, slot: Option<&str>) -> bool {
        match slot {
            Some(slot) => match self.slot_scope_mut(slot) {
                Some(scope) => {
                    let removed = !scope.is_empty();
                    scope.clear();
                    removed
                }
                None => false,
            },
            None => {
                let mut removed = !self.global.is_empty();
                self.global.clear();
                for (_, scope) in &mut self.slots {
                    removed |= !scope.is_empty();
                    scope.clear();
                }
                removed
            }
        }
    }

    fn slot_scope(&self, slot: &str) -> Option<&Scope> {
        self.slots
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, scope)| scope)
    }

    fn slot_scope_mut(&mut self, slot: &str) -> Option<&mut Scope> {
        self.slots
            .iter_mut()
            .find(|(name, _)| name == slot)
            .map(|(_, scope)| scope)
    }

    fn find(&self, name: &str, slot: Option<&str>) -> Option<&VarValue> {
        match slot {
            Some(slot) => self.slot_scope(slot)?.get(name),
            None => self.global.get(name).or_else(|| {
                self.slots
                    .iter()
                    .find_map(|(_, scope)| scope.get(name))
            }),
        }
    }

    fn lookup(&self, name: &str, slot: Option<&str>) -> MiravaResult<&VarValue> {
        self.find(name, slot)
            .ok_or_else(|| MiravaError::VariableNotFound(name.to_string()))
    }

    /// Insert or overwrite; `true` means the variable was created.
    fn set(&mut self, name: &str, value: VarValue, slot: Option<&str>) -> bool {
        match slot {
            Some(slot) => {
                self.register_slot(slot);
                let scope = self
                    .slot_scope_mut(slot)
                    .expect("scope registered just above");
                scope.insert(name.to_string(), value).is_none()
            }
            None => {
                // Overwrite wherever lookup would find the name; create
                // globally otherwise.
                if self.global.contains_key(name) {
                    self.global.insert(name.to_string(), value);
                    return false;
                }
                for (_, scope) in &mut self.slots {
                    if let Some(existing) = scope.get_mut(name) {
                        *existing = value;
                        return false;
                    }
                }
                self.global.insert(name.to_string(), value);
                true
            }
        }
    }
}

fn mismatch(name: &str, requested: VarType, actual: VarType) -> MiravaError {
    MiravaError::VariableTypeMismatch {
        name: name.to_string(),
        requested,
        actual,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scripting/vars.rs"]
mod tests;
