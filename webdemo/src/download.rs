use anyhow::{anyhow, Result as AnyhowResult};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{js_sys, Blob, BlobPropertyBag, HtmlAnchorElement, Url};

/// Offers `text` to the user as a file download.
pub fn download_text(file_name: &str, text: &str) -> AnyhowResult<()> {
    let parts = js_sys::Array::of1(&JsValue::from_str(text));
    let options = BlobPropertyBag::new();
    options.set_type("text/plain;charset=utf-8");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
        .map_err(|e| anyhow!("create blob: {:?}", e))?;
    let url =
        Url::create_object_url_with_blob(&blob).map_err(|e| anyhow!("create object url: {:?}", e))?;

    let clicked = click_link(&url, file_name);
    Url::revoke_object_url(&url).map_err(|e| anyhow!("revoke object url: {:?}", e))?;
    clicked
}

fn click_link(href: &str, file_name: &str) -> AnyhowResult<()> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| anyhow!("no document"))?;
    let anchor = document
        .create_element("a")
        .map_err(|e| anyhow!("create anchor: {:?}", e))?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|e| anyhow!("anchor dyn cast failed: {:?}", e))?;
    anchor.set_href(href);
    anchor.set_download(file_name);
    anchor.click();
    Ok(())
}
