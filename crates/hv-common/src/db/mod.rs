pub mod assignments;
pub mod migrations;
pub mod opportunities;
pub mod pool;
pub mod profiles;
pub mod util;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use assignments::{
    AssignmentStorageError, DIRECT_ASSIGNMENT_REASON, DirectAssignment,
    application_statuses_for_project, assign_confirmed, find_application, find_task_application,
    insert_application, insert_task_application, list_admin_applications, list_for_volunteer,
    update_status, upsert_recommendations,
};
pub use migrations::{MigrationError, run_migrations};
pub use opportunities::{
    OpportunityStorageError, SlotReservation, delete_project, delete_task, fetch_project,
    fetch_task, insert_project, insert_task, list_active_projects, list_open_upcoming_tasks,
    list_projects, list_projects_starting_soon, list_tasks, list_tasks_recent_first,
    release_project_slot, reserve_project_slots, set_project_status, update_project, update_task,
};
pub use pool::{DbPoolError, PgPool, create_pool_from_url, create_pool_from_url_checked};
pub use profiles::{
    ProfileStorageError, ensure_profile, fetch_profile, fetch_role, list_open_volunteers,
    list_profiles, set_availability, set_role, toggle_availability, update_profile,
};
pub use util::TimedClientExt;
