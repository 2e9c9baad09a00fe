#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use levy_server::{
    build_router,
    commission::CommissionRates,
    identity::{IdentityProfile, StaticIdentityVerifier},
    remote::{RemoteApi, RemotePaths},
    revalidate::Revalidator,
    role::Role,
    session::{Session, SessionKey},
    store::{generate_id, Store, User, UserStatus, Vehicle, VehicleStatus},
    AppState,
};
use tempfile::TempDir;

pub const REMOTE_SECRET: &str = "remote-secret";
pub const UPSTREAM_TOKEN: &str = "upstream-token";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _dir: TempDir,
}

pub fn app() -> TestApp {
    app_with_remote(None)
}

/// Remote calls go to `remote_url` when given.
pub fn app_with_remote(remote_url: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("levy.db")).unwrap();
    let remote = remote_url
        .map(|url| RemoteApi::new(url, REMOTE_SECRET, RemotePaths::default()).unwrap());

    let state = AppState {
        store,
        session_key: Arc::new(SessionKey::new(b"test-session-secret".to_vec())),
        session_ttl: 3600,
        remote,
        identity: Arc::new(StaticIdentityVerifier::new([IdentityProfile {
            identifier: "12345678901".into(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            phone: None,
            date_of_birth: None,
        }])),
        commission: CommissionRates {
            rate: 5.0,
            agent_share: 60.0,
            agency_share: 40.0,
        },
        revalidator: Revalidator::default(),
        trust_proxy: true,
    };

    let server = TestServer::new(build_router(state.clone())).unwrap();
    TestApp {
        server,
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub fn token_for(&self, user_id: &str, role: Role) -> String {
        self.token_expiring(user_id, role, levy_server::now() + 3600)
    }

    pub fn token_expiring(&self, user_id: &str, role: Role, expires_at: i64) -> String {
        self.state.session_key.issue(&Session {
            user_id: user_id.into(),
            role,
            token: UPSTREAM_TOKEN.into(),
            expires_at,
        })
    }

    /// Stores a user and returns it with a valid token.
    pub fn user(&self, role: Role) -> (User, String) {
        let id = generate_id();
        let user = User {
            name: format!("{role} user"),
            email: format!("{id}@example.ng"),
            id,
            phone: None,
            role,
            status: UserStatus::Active,
            blacklisted: false,
            created_at: levy_server::now(),
            deleted_at: None,
        };
        self.state.store.insert(&user).unwrap();
        let token = self.token_for(&user.id, role);
        (user, token)
    }

    pub fn vehicle(&self, plate: &str, owner_id: Option<&str>) -> Vehicle {
        let vehicle = Vehicle {
            id: generate_id(),
            plate_number: plate.into(),
            vin: None,
            category: "PRIVATE".into(),
            vehicle_type: None,
            status: VehicleStatus::Active,
            owner_id: owner_id.map(Into::into),
            group_id: None,
            security_code: "00000000".into(),
            created_at: levy_server::now(),
            deleted_at: None,
        };
        self.state.store.insert(&vehicle).unwrap();
        vehicle
    }
}
