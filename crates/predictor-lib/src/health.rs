//! Health check infrastructure for the prediction service
//!
//! Tracks component health for the `/health` diagnostics endpoint and the
//! `/readyz` readiness probe.

use crate::models::local_timestamp;
use crate::service::PredictionService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn checked_now(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub model_loaded: bool,
    pub timestamp: String,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ESTIMATOR: &str = "estimator";
    pub const METADATA: &str = "metadata";
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Registry with estimator and metadata components reflecting the service
    pub async fn for_service(service: &PredictionService) -> Self {
        let registry = Self::new();

        match service.unavailable_reason() {
            None => registry.set_healthy(components::ESTIMATOR).await,
            Some(reason) => registry.set_unhealthy(components::ESTIMATOR, reason).await,
        }

        if service.metadata_provider().is_loaded() {
            registry.set_healthy(components::METADATA).await;
        } else {
            registry
                .set_degraded(components::METADATA, "Model metadata not available")
                .await;
        }

        registry
    }

    /// Update component health status
    async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        let health = ComponentHealth::checked_now(ComponentStatus::Healthy, None);
        self.update(name, health).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        let health = ComponentHealth::checked_now(ComponentStatus::Degraded, Some(message.into()));
        self.update(name, health).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        let health = ComponentHealth::checked_now(ComponentStatus::Unhealthy, Some(message.into()));
        self.update(name, health).await;
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let snapshot = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&snapshot);
        let model_loaded = snapshot
            .get(components::ESTIMATOR)
            .map(|c| c.status == ComponentStatus::Healthy)
            .unwrap_or(false);

        HealthResponse {
            status,
            model_loaded,
            timestamp: local_timestamp(),
            components: snapshot,
        }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            }
        } else if !health.model_loaded {
            ReadinessResponse {
                ready: false,
                reason: Some("Model not loaded".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::LinearEstimator;
    use crate::metadata::MetadataProvider;
    use crate::service::ModelState;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
        assert!(!health.model_loaded);
    }

    #[tokio::test]
    async fn test_registry_for_ready_service() {
        let service = PredictionService::new(ModelState::ready(
            std::sync::Arc::new(LinearEstimator::deterministic()),
            MetadataProvider::new(LinearEstimator::reference_metadata()),
        ));
        let registry = HealthRegistry::for_service(&service).await;
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.model_loaded);
        assert!(health.components.contains_key(components::METADATA));
    }

    #[tokio::test]
    async fn test_registry_for_unavailable_service() {
        let service = PredictionService::new(ModelState::unavailable("no artifact"));
        let registry = HealthRegistry::for_service(&service).await;
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(!health.model_loaded);
        assert_eq!(
            health.components[components::ESTIMATOR].message.as_deref(),
            Some("no artifact")
        );
    }

    #[tokio::test]
    async fn test_degraded_when_metadata_missing() {
        let service = PredictionService::new(ModelState::ready(
            std::sync::Arc::new(LinearEstimator::deterministic()),
            MetadataProvider::empty(),
        ));
        let registry = HealthRegistry::for_service(&service).await;
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.model_loaded);
        assert_eq!(
            health.components[components::METADATA].message.as_deref(),
            Some("Model metadata not available")
        );
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        registry.set_healthy(components::ESTIMATOR).await;
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_ready_when_set() {
        let registry = HealthRegistry::new();
        registry.set_healthy(components::ESTIMATOR).await;
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(readiness.ready);
    }

    #[tokio::test]
    async fn test_readiness_requires_model() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        registry.set_unhealthy(components::ESTIMATOR, "Failed").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Model not loaded"));
    }
}
