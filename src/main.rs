use nu_plugin::{serve_plugin, MsgPackSerializer};
use nu_plugin_topicmap::TopicMapPlugin;

fn main() {
    serve_plugin(&TopicMapPlugin, MsgPackSerializer {})
}
