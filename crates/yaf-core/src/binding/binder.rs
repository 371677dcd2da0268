//! Binding determinista de parámetros.
//!
//! Para cada parámetro, en orden de posición:
//! 1. infraestructura por tipo (`declared_type` presente en el `InfraContext`);
//! 2. argumento con el mismo nombre aún no consumido;
//! 3. siguiente argumento no consumido en orden de la bolsa (cursor
//!    compartido que sólo avanza por esta vía);
//! 4. si nada aplica: `BindError::Arity`.
//!
//! El estado (cursor + consumidos) vive sólo durante una llamada a `bind`.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::BindError;
use crate::model::{ArgumentBag, BoundArguments, InfraContext, OperationDescriptor, ParamDescriptor};
use crate::value::OpValue;

/// Política de comparación entre nombre de parámetro y nombre de argumento.
///
/// El lookup de operaciones no distingue mayúsculas pero, por defecto, el
/// match por nombre de parámetro sí lo hace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatching {
    #[default]
    Sensitive,
    Insensitive,
}

impl NameMatching {
    fn matches(self, param: &str, arg: &str) -> bool {
        match self {
            NameMatching::Sensitive => param == arg,
            NameMatching::Insensitive => param.to_lowercase() == arg.to_lowercase(),
        }
    }
}

impl FromStr for NameMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sensitive" | "case-sensitive" => Ok(NameMatching::Sensitive),
            "insensitive" | "case-insensitive" => Ok(NameMatching::Insensitive),
            other => Err(format!("unknown name matching policy '{other}'")),
        }
    }
}

impl fmt::Display for NameMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatching::Sensitive => f.write_str("sensitive"),
            NameMatching::Insensitive => f.write_str("insensitive"),
        }
    }
}

/// Origen del valor enlazado a un parámetro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    Infrastructure,
    /// Índice de la entrada de la bolsa usada por nombre.
    Named(usize),
    /// Índice de la entrada de la bolsa usada por posición.
    Positional(usize),
}

/// Estado local de una llamada.
struct BindState {
    consumed: Vec<bool>,
    cursor: usize,
}

impl BindState {
    fn new(len: usize) -> Self {
        Self { consumed: vec![false; len],
               cursor: 0 }
    }

    fn next_positional(&mut self) -> Option<usize> {
        while self.cursor < self.consumed.len() && self.consumed[self.cursor] {
            self.cursor += 1;
        }
        if self.cursor >= self.consumed.len() {
            return None;
        }
        let idx = self.cursor;
        self.consumed[idx] = true;
        self.cursor += 1;
        Some(idx)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterBinder {
    name_matching: NameMatching,
}

impl ParameterBinder {
    pub fn new(name_matching: NameMatching) -> Self {
        Self { name_matching }
    }

    pub fn name_matching(&self) -> NameMatching {
        self.name_matching
    }

    /// Resuelve, sin copiar valores, de dónde sale cada parámetro.
    pub fn plan(&self,
                signature: &OperationDescriptor,
                infra: &InfraContext,
                args: &ArgumentBag)
                -> Result<Vec<BindingSource>, BindError> {
        let entries = args.entries();
        let mut state = BindState::new(entries.len());
        let mut plan = Vec::with_capacity(signature.parameters.len());

        for param in &signature.parameters {
            let source = if infra.contains(&param.declared_type) {
                BindingSource::Infrastructure
            } else if let Some(idx) = self.find_named(param, args, &state) {
                state.consumed[idx] = true;
                BindingSource::Named(idx)
            } else if let Some(idx) = state.next_positional() {
                BindingSource::Positional(idx)
            } else {
                return Err(BindError::Arity { operation: signature.name.clone(),
                                              parameter: param.name.clone(),
                                              position: param.position });
            };
            debug!("bind {}.{} <- {:?}", signature.name, param.name, source);
            plan.push(source);
        }

        let unused = state.consumed.iter().filter(|c| !**c).count();
        if unused > 0 {
            debug!("bind {}: {} argument(s) left unused", signature.name, unused);
        }
        Ok(plan)
    }

    /// Produce los argumentos finales en el orden de la firma.
    pub fn bind(&self,
                signature: &OperationDescriptor,
                infra: &InfraContext,
                args: &ArgumentBag)
                -> Result<BoundArguments, BindError> {
        let plan = self.plan(signature, infra, args)?;
        let entries = args.entries();
        let mut values: Vec<OpValue> = Vec::with_capacity(plan.len());

        for (param, source) in signature.parameters.iter().zip(plan) {
            let value = match source {
                BindingSource::Infrastructure => infra.get(&param.declared_type).cloned().unwrap_or(OpValue::Null),
                BindingSource::Named(idx) | BindingSource::Positional(idx) => entries[idx].value.clone(),
            };
            if !param.declared_type.accepts(&value) {
                return Err(BindError::TypeMismatch { operation: signature.name.clone(),
                                                     parameter: param.name.clone(),
                                                     expected: param.declared_type.to_string(),
                                                     found: value.kind_name().to_string() });
            }
            values.push(value);
        }

        let names = signature.parameters.iter().map(|p| p.name.clone()).collect();
        Ok(BoundArguments::new(signature.name.clone(), names, values))
    }

    fn find_named(&self, param: &ParamDescriptor, args: &ArgumentBag, state: &BindState) -> Option<usize> {
        args.entries().iter().enumerate().position(|(idx, entry)| {
                                                   !state.consumed[idx]
                                                   && entry.name
                                                           .as_deref()
                                                           .is_some_and(|n| self.name_matching.matches(&param.name, n))
                                               })
    }
}
