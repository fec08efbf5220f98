use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

// Compiled into the binary so the server runs from any working directory.
const TEMPLATES: &[(&str, &str)] = &[
    ("layouts/base", include_str!("../../templates/layouts/base.hbs")),
    ("pages/home", include_str!("../../templates/pages/home.hbs")),
    ("pages/not_found", include_str!("../../templates/pages/not_found.hbs")),
    ("partials/search_results", include_str!("../../templates/partials/search_results.hbs")),
    ("partials/quote", include_str!("../../templates/partials/quote.hbs")),
    ("partials/alerts_list", include_str!("../../templates/partials/alerts_list.hbs")),
    ("partials/notifications", include_str!("../../templates/partials/notifications.hbs")),
];

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();

    for (name, source) in TEMPLATES {
        hb.register_template_string(name, source)
            .unwrap_or_else(|e| panic!("template {name}: {e}"));
    }

    Arc::new(hb)
}
