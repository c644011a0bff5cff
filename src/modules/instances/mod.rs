pub mod models;
pub mod repository;
pub mod routes;
pub mod store;
pub mod validate;
pub mod views;
pub mod workflow;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use catalog_db::Database;
use catalog_kernel::{InitCtx, Module};
use serde_json::json;

use repository::BookLookup;
use store::SurrealCatalogStore;
use workflow::InstanceWorkflow;

/// Book copy management: list, detail, create, update and delete.
pub struct InstancesModule {
    store: SurrealCatalogStore,
    workflow: InstanceWorkflow,
}

impl InstancesModule {
    pub fn new(db: &Database) -> Self {
        let store = SurrealCatalogStore::new(db);
        let shared = Arc::new(store.clone());
        Self {
            store,
            workflow: InstanceWorkflow::new(shared.clone(), shared),
        }
    }
}

#[async_trait]
impl Module for InstancesModule {
    fn name(&self) -> &'static str {
        "instances"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.database.seed_books {
            let seeded = self
                .store
                .seed_books(store::sample_books())
                .await
                .context("failed to seed reference books")?;
            tracing::info!(module = self.name(), books = seeded, "reference books seeded");
        }

        // Copies can only reference existing books, and nothing else adds them.
        if self
            .store
            .list_book_titles()
            .await
            .context("failed to read reference books")?
            .is_empty()
        {
            anyhow::bail!(
                "no reference books in database '{}'; enable database.seed_books",
                ctx.db.name()
            );
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "instances module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.workflow.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);
        let form_body = json!({
            "required": true,
            "content": {
                "application/x-www-form-urlencoded": {
                    "schema": { "$ref": "#/components/schemas/InstanceForm" }
                }
            }
        });
        let view = json!({
            "description": "Rendered view",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/View" } }
            }
        });
        let rejected = json!({
            "description": "Form rendered again with validation errors",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/View" } }
            }
        });
        let redirect = json!({ "description": "Redirect to the resulting location" });
        let failure = json!({
            "description": "Internal server error",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } }
            }
        });

        Some(json!({
            "paths": {
                "/instances": {
                    "get": {
                        "summary": "List book copies",
                        "tags": ["Instances"],
                        "responses": { "200": view, "500": failure }
                    }
                },
                "/instances/create": {
                    "get": {
                        "summary": "Creation form",
                        "tags": ["Instances"],
                        "responses": { "200": view, "500": failure }
                    },
                    "post": {
                        "summary": "Create a book copy",
                        "tags": ["Instances"],
                        "requestBody": form_body,
                        "responses": { "303": redirect, "422": rejected, "500": failure }
                    }
                },
                "/instances/{id}": {
                    "get": {
                        "summary": "Book copy detail",
                        "tags": ["Instances"],
                        "parameters": id_param,
                        "responses": {
                            "200": view,
                            "404": {
                                "description": "Book copy not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "500": failure
                        }
                    }
                },
                "/instances/{id}/update": {
                    "get": {
                        "summary": "Update form; redirects to the list when the copy is missing",
                        "tags": ["Instances"],
                        "parameters": id_param,
                        "responses": { "200": view, "303": redirect, "500": failure }
                    },
                    "post": {
                        "summary": "Replace every field of a book copy",
                        "tags": ["Instances"],
                        "parameters": id_param,
                        "requestBody": form_body,
                        "responses": { "303": redirect, "422": rejected, "500": failure }
                    }
                },
                "/instances/{id}/delete": {
                    "get": {
                        "summary": "Delete confirmation; redirects to the list when the copy is missing",
                        "tags": ["Instances"],
                        "parameters": id_param,
                        "responses": { "200": view, "303": redirect, "500": failure }
                    },
                    "post": {
                        "summary": "Delete a book copy",
                        "tags": ["Instances"],
                        "parameters": id_param,
                        "responses": { "303": redirect, "500": failure }
                    }
                }
            },
            "components": {
                "schemas": {
                    "InstanceForm": {
                        "type": "object",
                        "properties": {
                            "book": { "type": "string", "description": "Referenced book id" },
                            "imprint": { "type": "string" },
                            "status": {
                                "type": "string",
                                "enum": ["Maintenance", "Available", "Loaned", "Reserved"]
                            },
                            "due_back": { "type": "string", "format": "date" }
                        },
                        "required": ["book", "imprint", "status", "due_back"]
                    },
                    "View": {
                        "type": "object",
                        "properties": {
                            "view": {
                                "type": "string",
                                "enum": [
                                    "instance_list",
                                    "instance_detail",
                                    "instance_form",
                                    "instance_delete"
                                ]
                            },
                            "title": { "type": "string" }
                        },
                        "required": ["view", "title"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "instances module stopped");
        Ok(())
    }
}

/// Create the instances module over the given database
pub fn create_module(db: &Database) -> Arc<dyn Module> {
    Arc::new(InstancesModule::new(db))
}
