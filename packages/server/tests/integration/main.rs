
mod files;
mod root;
mod workflows;
