//! Reports argument coercion failures the way graphql-js does:
//! `Expected type Address!, found "0x1234"; <reason>`.
//!
//! async-graphql rejects an invalid literal argument during validation, but
//! its message names neither the declared type with its nullability nor the
//! offending literal. The extension records every argument literal while the
//! query is parsed and rewrites matching validation errors afterwards.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_graphql::{
    extensions::{Extension, ExtensionContext, ExtensionFactory, NextParseQuery, NextValidation},
    parser::{
        parse_schema,
        types::{
            BaseType, DocumentOperations, ExecutableDocument, Selection, SelectionSet, Type,
            TypeKind, TypeSystemDefinition,
        },
    },
    Pos, ServerError, ServerResult, ValidationResult, Value, Variables,
};
use tracing::warn;

/// Explains why a literal was rejected by an input type, `None` if accepted.
pub type Rejection = fn(&Value) -> Option<String>;

/// Argument type as declared in the schema, keyed by `(field, argument)`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DeclaredArgument {
    ty: String,
    base: String,
}

#[derive(Debug)]
struct ArgumentSite {
    field: String,
    argument: String,
    literal: Option<Value>,
}

#[derive(Clone, Default)]
pub struct CoercionErrors {
    declared: Arc<HashMap<(String, String), DeclaredArgument>>,
    rejections: Arc<HashMap<String, Rejection>>,
}

impl CoercionErrors {
    /// Builds the argument table from the schema SDL.
    pub fn new(sdl: &str) -> Self {
        let declared = match parse_schema(sdl) {
            Ok(document) => declared_arguments(document.definitions),
            Err(err) => {
                warn!(%err, "can't parse schema sdl, coercion errors are left as is");
                HashMap::new()
            }
        };

        Self {
            declared: Arc::new(declared),
            rejections: Arc::default(),
        }
    }

    /// Registers the explanation used for literals of the named input type.
    pub fn with_rejection(mut self, type_name: &str, rejection: Rejection) -> Self {
        Arc::make_mut(&mut self.rejections).insert(type_name.to_owned(), rejection);
        self
    }
}

fn declared_arguments(
    definitions: Vec<TypeSystemDefinition>,
) -> HashMap<(String, String), DeclaredArgument> {
    let mut declared = HashMap::new();

    for definition in definitions {
        let TypeSystemDefinition::Type(definition) = definition else {
            continue;
        };
        let TypeKind::Object(object) = definition.node.kind else {
            continue;
        };

        for field in object.fields {
            for argument in field.node.arguments {
                let key = (
                    field.node.name.node.to_string(),
                    argument.node.name.node.to_string(),
                );
                let ty = &argument.node.ty.node;
                declared.entry(key).or_insert_with(|| DeclaredArgument {
                    ty: ty.to_string(),
                    base: base_name(ty),
                });
            }
        }
    }

    declared
}

fn base_name(ty: &Type) -> String {
    match &ty.base {
        BaseType::Named(name) => name.to_string(),
        BaseType::List(inner) => base_name(inner),
    }
}

impl ExtensionFactory for CoercionErrors {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(CoercionErrorsExtension {
            declared: self.declared.clone(),
            rejections: self.rejections.clone(),
            sites: Mutex::default(),
        })
    }
}

struct CoercionErrorsExtension {
    declared: Arc<HashMap<(String, String), DeclaredArgument>>,
    rejections: Arc<HashMap<String, Rejection>>,
    sites: Mutex<HashMap<Pos, Arc<ArgumentSite>>>,
}

#[async_trait::async_trait]
impl Extension for CoercionErrorsExtension {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let document = next.run(ctx, query, variables).await?;

        let mut sites = HashMap::new();
        collect_document(&document, variables, &mut sites);
        *self.sites.lock().unwrap_or_else(PoisonError::into_inner) = sites;

        Ok(document)
    }

    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        next.run(ctx).await.map_err(|errors| {
            errors
                .into_iter()
                .map(|error| self.rewrite(error))
                .collect()
        })
    }
}

impl CoercionErrorsExtension {
    fn rewrite(&self, mut error: ServerError) -> ServerError {
        if !is_coercion_failure(&error.message) {
            return error;
        }

        let sites = self.sites.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(site) = error.locations.iter().find_map(|pos| sites.get(pos)) else {
            return error;
        };
        let Some(declared) = self
            .declared
            .get(&(site.field.clone(), site.argument.clone()))
        else {
            return error;
        };

        let mut message = format!("Expected type {}", declared.ty);
        if let Some(literal) = &site.literal {
            message.push_str(&format!(", found {}", literal));

            let reason = self
                .rejections
                .get(&declared.base)
                .and_then(|rejection| explain(*rejection, literal));
            match reason {
                Some(reason) => message.push_str(&format!("; {}", reason)),
                None => message.push('.'),
            }
        } else {
            message.push('.');
        }

        error.message = message;
        error
    }
}

fn is_coercion_failure(message: &str) -> bool {
    message.starts_with("Invalid value") || message.contains("expected type")
}

/// Lists are explained by their first rejected element.
fn explain(rejection: Rejection, literal: &Value) -> Option<String> {
    match literal {
        Value::List(items) => items.iter().find_map(|item| explain(rejection, item)),
        other => rejection(other),
    }
}

type Sites = HashMap<Pos, Arc<ArgumentSite>>;

fn collect_document(document: &ExecutableDocument, variables: &Variables, sites: &mut Sites) {
    match &document.operations {
        DocumentOperations::Single(operation) => {
            collect_selection_set(&operation.node.selection_set.node, variables, sites)
        }
        DocumentOperations::Multiple(operations) => {
            for operation in operations.values() {
                collect_selection_set(&operation.node.selection_set.node, variables, sites);
            }
        }
    }

    for fragment in document.fragments.values() {
        collect_selection_set(&fragment.node.selection_set.node, variables, sites);
    }
}

fn collect_selection_set(set: &SelectionSet, variables: &Variables, sites: &mut Sites) {
    for selection in &set.items {
        match &selection.node {
            Selection::Field(field) => {
                let field = &field.node;
                for (name, value) in &field.arguments {
                    let site = Arc::new(ArgumentSite {
                        field: field.name.node.to_string(),
                        argument: name.node.to_string(),
                        // variables are substituted so their values can be reported too
                        literal: value
                            .node
                            .clone()
                            .into_const_with(|name| variables.get(&name).cloned().ok_or(()))
                            .ok(),
                    });
                    // the error may point at either the name or the value
                    sites.insert(name.pos, site.clone());
                    sites.insert(value.pos, site);
                }
                collect_selection_set(&field.selection_set.node, variables, sites);
            }
            Selection::InlineFragment(fragment) => {
                collect_selection_set(&fragment.node.selection_set.node, variables, sites)
            }
            // fragment definitions are walked once from the document
            Selection::FragmentSpread(_) => {}
        }
    }
}
