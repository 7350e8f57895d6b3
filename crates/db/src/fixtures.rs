use serde::Serialize;

use hrflow_core::domain::actor::{Actor, Role};
use hrflow_core::workflow::hierarchy::{HierarchyResolver, HierarchyWalk};

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlActorDirectory};

/// Deterministic org chart used by `hrflow seed` and the end-to-end tests.
///
/// ```text
/// ceo-1
/// ├── fin-1
/// ├── hr-1
/// │   └── hr-2
/// └── mgr-1
///     ├── emp-1
///     └── emp-2
/// mgr-2 ── emp-3
/// ```
///
/// `mgr-2` reports to `ceo-1` as well; `emp-4` is inactive.
pub struct DemoOrgChart;

const DEMO_ACTORS: &[(&str, &str, Role, Option<&str>, bool)] = &[
    ("ceo-1", "Dana Whitfield", Role::Ceo, None, true),
    ("fin-1", "Farid Osei", Role::Finance, Some("ceo-1"), true),
    ("hr-1", "Hana Kobayashi", Role::Hr, Some("ceo-1"), true),
    ("hr-2", "Hugo Lindqvist", Role::Hr, Some("hr-1"), true),
    ("mgr-1", "Mira Santos", Role::Manager, Some("ceo-1"), true),
    ("mgr-2", "Marek Novak", Role::Manager, Some("ceo-1"), true),
    ("emp-1", "Elif Demir", Role::Employee, Some("mgr-1"), true),
    ("emp-2", "Eamon Byrne", Role::Employee, Some("mgr-1"), true),
    ("emp-3", "Esi Mensah", Role::Employee, Some("mgr-2"), true),
    ("emp-4", "Emil Varga", Role::Employee, Some("mgr-2"), false),
];

impl DemoOrgChart {
    pub fn actors() -> Vec<Actor> {
        DEMO_ACTORS
            .iter()
            .map(|(id, name, role, reports_to, active)| {
                let mut actor = Actor::new(*id, *role).named(*name);
                if let Some(manager) = reports_to {
                    actor = actor.reporting_to(*manager);
                }
                actor.active = *active;
                actor
            })
            .collect()
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let directory = SqlActorDirectory::new(pool.clone());
        let actors = Self::actors();
        for actor in &actors {
            directory.save(actor).await?;
        }

        Ok(SeedResult {
            actors_seeded: actors.iter().map(|actor| actor.id.0.clone()).collect(),
        })
    }

    /// Every demo actor is present with its role, and every reporting chain
    /// terminates without a cycle.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let directory = SqlActorDirectory::new(pool.clone());
        let stored = directory.list_all().await?;
        let resolver = HierarchyResolver::default();

        let mut checks = Vec::new();
        for expected in Self::actors() {
            let present = stored
                .iter()
                .any(|actor| actor.id == expected.id && actor.role == expected.role);
            checks.push((expected.id.0.clone(), present));

            let walk = resolver
                .walk(&directory, &expected.id)
                .await
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;
            checks.push((
                format!("{} reporting chain", expected.id),
                matches!(walk, HierarchyWalk::Complete(_)),
            ));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SeedResult {
    pub actors_seeded: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
