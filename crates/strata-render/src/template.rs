//! Template engine used inside render workers.
//!
//! Templates are rendered with minijinja. Includes are resolved against the
//! directory of the template that contains the `{% include %}` tag, so every
//! nested include sees its own file's location as the base. The base travels
//! with each template name rather than living in process-wide state, which
//! means an include that fails cannot leave a stale base behind for its caller.
//!
//! Helpers available to templates:
//! - `current_uri`: the URI the page will be served at
//! - `relative_uri(uri)`: `uri` rewritten relative to `current_uri`
//! - `collapse_whitespace`: filter collapsing whitespace runs to one space

use std::borrow::Cow;
use std::io;
use std::path::Path;

use minijinja::{Environment, Error, ErrorKind, Value, context};

/// Render the template at `template_path` for the page at `base_uri`.
///
/// # Errors
///
/// Returns the template error (syntax, missing include, I/O) with its
/// location.
pub fn render_template(template_path: &Path, base_uri: &str) -> Result<String, Error> {
    let template_path = std::path::absolute(template_path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot resolve template path {}", template_path.display()),
        )
        .with_source(e)
    })?;

    let env = environment(base_uri);
    let name = template_path.to_string_lossy();
    let template = env.get_template(&name)?;
    template.render(context! { current_uri => base_uri })
}

fn environment(base_uri: &str) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(load_template);
    env.set_path_join_callback(join_include_path);
    env.add_filter("collapse_whitespace", collapse_whitespace);

    let base = base_uri.to_owned();
    env.add_function("relative_uri", move |uri: String| {
        Value::from_safe_string(relative_uri(&base, &uri))
    });
    env
}

/// Template names are absolute file paths.
fn load_template(name: &str) -> Result<Option<String>, Error> {
    match std::fs::read_to_string(name) {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot read template {name}"),
        )
        .with_source(e)),
    }
}

/// Resolve an include name against the including template's directory.
fn join_include_path<'s>(name: &'s str, parent: &'s str) -> Cow<'s, str> {
    if Path::new(name).is_absolute() {
        return Cow::Borrowed(name);
    }
    let base = Path::new(parent).parent().unwrap_or(Path::new("/"));
    Cow::Owned(base.join(name).to_string_lossy().into_owned())
}

fn collapse_whitespace(value: String) -> String {
    let mut collapsed = String::with_capacity(value.len());
    let mut in_whitespace = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(ch);
            in_whitespace = false;
        }
    }
    collapsed
}

/// Rewrite an absolute site URI relative to the page at `base_uri`.
///
/// URIs with a scheme (`https:`, `mailto:`) and URIs that are already
/// relative are returned unchanged. A trailing slash on `uri` is kept.
pub fn relative_uri(base_uri: &str, uri: &str) -> String {
    if has_scheme(uri) || !uri.starts_with('/') {
        return uri.to_owned();
    }

    // A base that names a file is relative to the directory holding it.
    let base_dir = match base_uri.rfind('/') {
        Some(index) => &base_uri[..=index],
        None => "/",
    };

    let from: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = uri.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    let relative = parts.join("/");

    match (relative.is_empty(), uri.ends_with('/')) {
        (true, true) => "./".to_owned(),
        (true, false) => ".".to_owned(),
        (false, true) => format!("{relative}/"),
        (false, false) => relative,
    }
}

/// `^\w+:`
fn has_scheme(uri: &str) -> bool {
    let scheme_len: usize = uri
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum();
    scheme_len > 0 && uri[scheme_len..].starts_with(':')
}
