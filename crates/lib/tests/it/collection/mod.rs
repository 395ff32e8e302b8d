mod create;
mod delete_restore;
mod queries;
mod swap;
