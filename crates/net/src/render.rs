use meishi_config::BioMarkup;
use meishi_service::{CardView, Notice, RegistrationPage};
use minijinja::{context, Environment};

const TEMPLATES: [(&str, &str); 4] = [
    ("layout.html", include_str!("../templates/layout.html")),
    ("landing.html", include_str!("../templates/landing.html")),
    ("card.html", include_str!("../templates/card.html")),
    ("register.html", include_str!("../templates/register.html")),
];

/// HTML views, compiled once at startup. `.html` templates autoescape.
pub struct Renderer {
    env: Environment<'static>,
    bio_markup: BioMarkup,
}

impl Renderer {
    pub fn new(bio_markup: BioMarkup) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env, bio_markup })
    }

    pub fn landing(
        &self,
        user_id: &str,
        error: Option<&str>,
        notice: Option<&Notice>,
    ) -> Result<String, minijinja::Error> {
        self.env
            .get_template("landing.html")?
            .render(context! { user_id, error, notice })
    }

    pub fn card(&self, view: &CardView) -> Result<String, minijinja::Error> {
        let raw_bio = self.bio_markup == BioMarkup::Raw;
        self.env
            .get_template("card.html")?
            .render(context! { view, raw_bio })
    }

    pub fn register(&self, page: &RegistrationPage) -> Result<String, minijinja::Error> {
        self.env.get_template("register.html")?.render(context! {
            page,
            notice => &page.notice,
            selector_enabled => page.skill_selector_enabled(),
            can_submit => page.can_submit(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meishi_service::Card;

    fn card_view(bio: &str) -> CardView {
        CardView::Card(Card {
            user_id: "coding".to_string(),
            name: "山田太郎".to_string(),
            bio: bio.to_string(),
            skills: None,
            links: Vec::new(),
        })
    }

    #[test]
    fn test_raw_bio_is_not_escaped() -> Result<(), Box<dyn std::error::Error>> {
        let renderer = Renderer::new(BioMarkup::Raw)?;
        let html = renderer.card(&card_view("<b>hi</b>"))?;
        assert!(html.contains("<b>hi</b>"));
        assert!(!html.contains("好きな技術"));
        Ok(())
    }

    #[test]
    fn test_escaped_bio() -> Result<(), Box<dyn std::error::Error>> {
        let renderer = Renderer::new(BioMarkup::Escaped)?;
        let html = renderer.card(&card_view("<b>hi</b>"))?;
        assert!(html.contains("&lt;b&gt;hi"));
        assert!(!html.contains("<b>hi</b>"));
        Ok(())
    }

    #[test]
    fn test_placeholder() -> Result<(), Box<dyn std::error::Error>> {
        let renderer = Renderer::new(BioMarkup::Raw)?;
        let html = renderer.card(&CardView::Placeholder)?;
        assert!(html.contains("Loading..."));
        Ok(())
    }

    #[test]
    fn test_register_form_disables_selector_before_skills_load(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let renderer = Renderer::new(BioMarkup::Raw)?;
        let html = renderer.register(&RegistrationPage::new())?;
        assert!(html.contains(r#"data-field="skill_id" disabled"#));
        Ok(())
    }
}
