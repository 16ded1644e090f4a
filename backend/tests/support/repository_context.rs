//! Per-test Diesel repositories over a freshly cloned database.

use chrono::Utc;
use course_market::domain::ports::{CourseRepository, IdentityRepository, NewIdentity};
use course_market::domain::{
    ContentType, Course, CourseFields, DisplayName, Email, IdentityId, MaterialId, MaterialRef,
    MaterialSource, NewCourse, Role,
};
use course_market::outbound::persistence::{
    DbPool, DieselCourseRepository, DieselIdentityRepository, DieselMaterialRepository,
    PoolConfig,
};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use tokio::runtime::Runtime;

use crate::embedded_postgres::{handle_cluster_setup_failure, provision_database, shared_cluster};

pub struct RepoContext {
    /// Runtime reused for every async call made by one test.
    pub runtime: Runtime,
    pub courses: DieselCourseRepository,
    pub materials: DieselMaterialRepository,
    pub identities: DieselIdentityRepository,
    pub database_url: String,
    _database: TemporaryDatabase,
}

impl RepoContext {
    fn setup() -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| err.to_string())?;
        let cluster = shared_cluster()?;
        let database = provision_database(cluster)?;
        let database_url = database.url().to_string();

        // Two writers must be able to hold connections at once.
        let config = PoolConfig::new(&database_url)
            .with_max_size(4)
            .with_min_idle(Some(1));
        let pool = runtime
            .block_on(DbPool::new(config))
            .map_err(|err| err.to_string())?;

        Ok(Self {
            runtime,
            courses: DieselCourseRepository::new(pool.clone()),
            materials: DieselMaterialRepository::new(pool.clone()),
            identities: DieselIdentityRepository::new(pool),
            database_url,
            _database: database,
        })
    }

    /// `None` when the cluster is unavailable and `SKIP_TEST_CLUSTER` is set.
    pub fn provision() -> Option<Self> {
        match Self::setup() {
            Ok(context) => Some(context),
            Err(reason) => handle_cluster_setup_failure(reason),
        }
    }

    pub fn instructor(&self, email: &str) -> IdentityId {
        let identity = NewIdentity {
            display_name: DisplayName::new("Instructor").expect("display name"),
            email: Email::new(email).expect("email"),
            role: Role::Instructor,
            phone: None,
            password_hash: "$argon2id$unused".into(),
        };
        self.runtime
            .block_on(self.identities.insert(&identity))
            .expect("insert identity")
            .id
    }

    pub fn course_for(&self, owner: IdentityId, name: &str) -> Course {
        let fields = CourseFields {
            name: name.into(),
            category: "craft".into(),
            price: "25.00".into(),
            delivery_mode: "in person".into(),
            ..CourseFields::default()
        };
        let course = NewCourse {
            owner_id: owner,
            details: fields.validate().expect("valid course"),
            cover_image_ref: None,
        };
        self.runtime
            .block_on(self.courses.insert(&course))
            .expect("insert course")
    }
}

pub fn durable_material(course: &Course, name: &str) -> MaterialRef {
    let id = MaterialId::random();
    MaterialRef {
        id,
        name: name.into(),
        source: MaterialSource::Durable {
            uri: format!("courses/{}/materials/{id}", course.id),
        },
        content_type: ContentType::classify(name),
        size_bytes: 3,
        uploaded_at: Utc::now(),
        uploaded_by: course.owner_id,
    }
}

pub fn names(materials: &[MaterialRef]) -> Vec<&str> {
    materials
        .iter()
        .map(|material| material.name.as_str())
        .collect()
}
