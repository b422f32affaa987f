// src/resources/application.rs
//! Application resource.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::response::{required_field, text_field};
use crate::client::{params, ApiReply, Params, Record, RestTransport};
use crate::config::constants::{self, ADD_FLAG_EDIT_ONLY, ADD_FLAG_NEW_ONLY};
use crate::resources::class_params::ClassParameters;
use crate::types::{IpamError, ObjectKind, Result};

/// Desired state of an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub class_parameters: ClassParameters,
}

/// Observed state of an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationState {
    pub id: String,
    pub name: String,
    pub class: String,
    pub class_parameters: ClassParameters,
}

fn write_params(config: &ApplicationConfig, id: Option<&str>, add_flag: &str) -> Params {
    let mut query = Params::new();
    if let Some(id) = id {
        query.push(("appapplication_id".to_string(), id.to_string()));
    }
    query.extend(params([
        ("add_flag", add_flag.to_string()),
        ("appapplication_name", config.name.clone()),
        ("appapplication_class_name", config.class.clone()),
        ("appapplication_class_parameters", config.class_parameters.encode()),
    ]));
    query
}

fn state_from_record(id: &str, record: &Record) -> Result<ApplicationState> {
    Ok(ApplicationState {
        id: id.to_string(),
        name: required_field(record, "appapplication_name")?,
        class: text_field(record, "appapplication_class_name").unwrap_or_default(),
        class_parameters: ClassParameters::decode(
            &text_field(record, "appapplication_class_parameters").unwrap_or_default(),
        )?,
    })
}

/// Application lifecycle
#[derive(Clone)]
pub struct ApplicationResource {
    transport: Arc<dyn RestTransport>,
}

impl ApplicationResource {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    async fn info(&self, id: &str) -> Result<ApiReply> {
        self.transport
            .request(Method::GET, constants::APP_APPLICATION_INFO, params([("appapplication_id", id)]))
            .await
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        debug!("Checking existence of application (oid): {}", id);
        match self.info(id).await? {
            ApiReply::Records { .. } => Ok(true),
            ApiReply::Empty { .. } => Ok(false),
            ApiReply::Failure(failure) => {
                debug!("Unable to find application (oid): {} ({})", id, failure.message);
                Ok(false)
            }
        }
    }

    pub async fn create(&self, config: &ApplicationConfig) -> Result<ApplicationState> {
        let reply = self.transport
            .request(Method::POST, constants::APP_APPLICATION_ADD, write_params(config, None, ADD_FLAG_NEW_ONLY))
            .await?;

        let id = written_oid(reply, &config.name)?;
        info!("Created application {} (oid): {}", config.name, id);
        Ok(ApplicationState {
            id,
            name: config.name.clone(),
            class: config.class.clone(),
            class_parameters: config.class_parameters.clone(),
        })
    }

    /// Read back an application, keeping only the configured class parameters
    pub async fn read(&self, id: &str, config: &ApplicationConfig) -> Result<ApplicationState> {
        let mut state = self.import(id).await?;
        state.class_parameters = state.class_parameters.project(&config.class_parameters);
        Ok(state)
    }

    pub async fn update(&self, id: &str, config: &ApplicationConfig) -> Result<ApplicationState> {
        let reply = self.transport
            .request(Method::PUT, constants::APP_APPLICATION_ADD, write_params(config, Some(id), ADD_FLAG_EDIT_ONLY))
            .await?;

        let id = written_oid(reply, &config.name)?;
        info!("Updated application {} (oid): {}", config.name, id);
        Ok(ApplicationState {
            id,
            name: config.name.clone(),
            class: config.class.clone(),
            class_parameters: config.class_parameters.clone(),
        })
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let reply = self.transport
            .request(Method::DELETE, constants::APP_APPLICATION_DELETE, params([("appapplication_id", id)]))
            .await?;

        match reply {
            ApiReply::Failure(failure) => Err(failure.into_error(ObjectKind::Application, id)),
            _ => {
                info!("Deleted application (oid): {}", id);
                Ok(())
            }
        }
    }

    /// Read an application from its identifier alone, with every class parameter
    pub async fn import(&self, id: &str) -> Result<ApplicationState> {
        let record = self.info(id).await?.into_first(ObjectKind::Application, id)?;
        state_from_record(id, &record)
    }
}

fn written_oid(reply: ApiReply, name: &str) -> Result<String> {
    match reply.created_oid() {
        Some(id) => Ok(id),
        None => {
            reply.into_first(ObjectKind::Application, name)?;
            Err(IpamError::backend(200, format!("application {}: no object id returned", name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockRestTransport;

    fn config() -> ApplicationConfig {
        ApplicationConfig {
            name: "billing".to_string(),
            class: "webapp".to_string(),
            class_parameters: ClassParameters::new().with("owner", "finance"),
        }
    }

    fn resource(transport: MockRestTransport) -> ApplicationResource {
        ApplicationResource::new(Arc::new(transport))
    }

    fn reply(status: u16, body: &str) -> Result<ApiReply> {
        ApiReply::from_parts(status, body)
    }

    #[test]
    fn test_write_params() {
        let p = write_params(&config(), Some("8"), ADD_FLAG_EDIT_ONLY);
        assert_eq!(p[0], ("appapplication_id".to_string(), "8".to_string()));
        assert!(p.contains(&("add_flag".to_string(), "edit_only".to_string())));
        assert!(p.contains(&("appapplication_class_parameters".to_string(), "owner=finance".to_string())));

        let p = write_params(&config(), None, ADD_FLAG_NEW_ONLY);
        assert!(!p.iter().any(|(k, _)| k == "appapplication_id"));
    }

    #[tokio::test]
    async fn test_create() {
        let mut transport = MockRestTransport::new();
        transport
            .expect_request()
            .withf(|method, path, p| {
                *method == Method::POST
                    && path == constants::APP_APPLICATION_ADD
                    && p.contains(&("add_flag".to_string(), "new_only".to_string()))
            })
            .times(1)
            .returning(|_, _, _| reply(201, r#"[{"ret_oid":"8"}]"#));

        let state = resource(transport).create(&config()).await.unwrap();
        assert_eq!(state.id, "8");
        assert_eq!(state.name, "billing");
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let mut transport = MockRestTransport::new();
        transport
            .expect_request()
            .returning(|_, _, _| reply(400, r#"[{"errmsg":"duplicate application"}]"#));

        let err = resource(transport).create(&config()).await.unwrap_err();
        assert!(err.to_string().contains("duplicate application"));
    }

    #[tokio::test]
    async fn test_read_projects_class_parameters() {
        let mut transport = MockRestTransport::new();
        transport
            .expect_request()
            .withf(|method, path, _| *method == Method::GET && path == constants::APP_APPLICATION_INFO)
            .returning(|_, _, _| {
                reply(200, r#"[{
                    "appapplication_name":"billing",
                    "appapplication_class_name":"webapp",
                    "appapplication_class_parameters":"owner=finance&tier=gold"
                }]"#)
            });

        let resource = resource(transport);
        let state = resource.read("8", &config()).await.unwrap();
        assert_eq!(state.class_parameters, ClassParameters::new().with("owner", "finance"));

        let imported = resource.import("8").await.unwrap();
        assert_eq!(imported.class_parameters.get("tier"), Some("gold"));
    }

    #[tokio::test]
    async fn test_exists() {
        let mut transport = MockRestTransport::new();
        transport
            .expect_request()
            .withf(|_, _, p| p == &params([("appapplication_id", "8")]))
            .times(1)
            .returning(|_, _, _| reply(200, r#"[{"appapplication_name":"billing"}]"#));
        transport
            .expect_request()
            .withf(|_, _, p| p == &params([("appapplication_id", "9")]))
            .times(1)
            .returning(|_, _, _| reply(400, r#"[{"errmsg":"no such application"}]"#));

        let resource = resource(transport);
        assert!(resource.exists("8").await.unwrap());
        assert!(!resource.exists("9").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_surfaces_errmsg() {
        let mut transport = MockRestTransport::new();
        transport
            .expect_request()
            .withf(|method, _, _| *method == Method::DELETE)
            .times(1)
            .returning(|_, _, _| reply(400, r#"[{"errmsg":"application in use"}]"#));

        let err = resource(transport).delete("8").await.unwrap_err();
        assert!(err.to_string().contains("application in use"));
    }
}
