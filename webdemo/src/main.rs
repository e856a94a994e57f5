use leptos::prelude::*;
use webdemo::{App, Theme};

fn main() {
    console_error_panic_hook::set_once();
    let search = web_sys::window()
        .and_then(|window| window.location().search().ok())
        .unwrap_or_default();
    let theme = Theme::from_query(&search);
    leptos::mount::mount_to_body(move || view! { <App theme=theme/> })
}
