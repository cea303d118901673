//! Stage definitions
//!
//! A stage is one deploy or reconcile invocation plus the stages it must
//! wait for. Stages are plain data so a whole pipeline can be written in a
//! configuration file:
//!
//! ```yaml
//! - name: reverse-registrar-setup
//!   reconcile:
//!     fallback:
//!       - node: reverse
//!         kind: owner
//!         owner: account:deployer
//!         via: root
//!   depends_on: [reverse-registrar]
//!   only_if_fresh: ReverseRegistrar
//! ```

use ensd_types::{ConstructorArg, Declaration};
use serde::{Deserialize, Serialize};

/// What a stage does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    /// Ensure a module is deployed
    Deploy {
        module: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<ConstructorArg>,
    },
    /// Reconcile the bindings declared for the active network
    Reconcile(Declaration),
}

/// An edge to an upstream stage
///
/// With `nodes` empty the dependent waits for the whole upstream stage and
/// is blocked by any failure in it. With `nodes` set it is blocked only if
/// one of those nodes failed upstream, or the upstream stage failed outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DependencySpec")]
pub struct StageDependency {
    pub stage: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencySpec {
    Stage(String),
    Scoped {
        stage: String,
        #[serde(default)]
        nodes: Vec<String>,
    },
}

impl From<DependencySpec> for StageDependency {
    fn from(spec: DependencySpec) -> Self {
        match spec {
            DependencySpec::Stage(stage) => Self {
                stage,
                nodes: Vec::new(),
            },
            DependencySpec::Scoped { stage, nodes } => Self { stage, nodes },
        }
    }
}

impl StageDependency {
    pub fn on(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            nodes: Vec::new(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        !self.nodes.is_empty()
    }
}

/// One step of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,

    #[serde(flatten)]
    pub action: StageAction,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<StageDependency>,

    /// Skip unless this module was freshly deployed in the same run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_if_fresh: Option<String>,
}

impl Stage {
    pub fn deploy(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: StageAction::Deploy {
                module: module.into(),
                args: Vec::new(),
            },
            depends_on: Vec::new(),
            only_if_fresh: None,
        }
    }

    pub fn reconcile(name: impl Into<String>, declaration: Declaration) -> Self {
        Self {
            name: name.into(),
            action: StageAction::Reconcile(declaration),
            depends_on: Vec::new(),
            only_if_fresh: None,
        }
    }

    /// Set constructor arguments; ignored for reconcile stages
    pub fn with_args(mut self, new_args: Vec<ConstructorArg>) -> Self {
        if let StageAction::Deploy { args, .. } = &mut self.action {
            *args = new_args;
        }
        self
    }

    /// Wait for the whole of `stage`
    pub fn after(mut self, stage: impl Into<String>) -> Self {
        self.depends_on.push(StageDependency::on(stage));
        self
    }

    /// Wait for `stage`, blocked only by failures on `nodes`
    pub fn after_nodes<I, S>(mut self, stage: impl Into<String>, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.push(StageDependency {
            stage: stage.into(),
            nodes: nodes.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn only_if_fresh(mut self, module: impl Into<String>) -> Self {
        self.only_if_fresh = Some(module.into());
        self
    }

    /// Module deployed by this stage, if it is a deploy stage
    pub fn module(&self) -> Option<&str> {
        match &self.action {
            StageAction::Deploy { module, .. } => Some(module),
            StageAction::Reconcile(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.action {
            StageAction::Deploy { .. } => "deploy",
            StageAction::Reconcile(_) => "reconcile",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensd_types::BindingTarget;

    #[test]
    fn test_stage_yaml() {
        let yaml = r#"
- name: registry
  deploy:
    module: ENSRegistry
- name: reverse-registrar
  deploy:
    module: ReverseRegistrar
    args: ["module:ENSRegistry"]
  depends_on: [registry]
- name: reverse-registrar-setup
  reconcile:
    fallback:
      - node: reverse
        kind: owner
        owner: account:deployer
        via: root
  depends_on:
    - reverse-registrar
    - stage: registry
      nodes: [reverse]
  only_if_fresh: ReverseRegistrar
"#;
        let stages: Vec<Stage> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].module(), Some("ENSRegistry"));
        assert_eq!(
            stages[1],
            Stage::deploy("reverse-registrar", "ReverseRegistrar")
                .with_args(vec!["module:ENSRegistry".parse().unwrap()])
                .after("registry")
        );

        let setup = &stages[2];
        assert_eq!(setup.kind(), "reconcile");
        assert_eq!(setup.only_if_fresh.as_deref(), Some("ReverseRegistrar"));
        assert!(!setup.depends_on[0].is_scoped());
        assert_eq!(setup.depends_on[1].nodes, vec!["reverse".to_string()]);
        let StageAction::Reconcile(declaration) = &setup.action else {
            panic!("expected reconcile stage");
        };
        assert!(matches!(
            declaration.bindings_for("goerli")[0].target,
            BindingTarget::Owner { .. }
        ));
    }
}
