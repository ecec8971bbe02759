/// Map a provider-qualified model name onto a single file system component.
pub fn clean_model_name_for_file_system(model_name: &str) -> String {
    model_name.replace(['/', '\\', ':'], "_")
}
