use nu_plugin::{serve_plugin, MsgPackSerializer};
use nu_plugin_gallery::GalleryPlugin;

fn main() {
    serve_plugin(&GalleryPlugin, MsgPackSerializer {})
}
