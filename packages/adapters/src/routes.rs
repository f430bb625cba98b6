//! Edit endpoint URLs.
//!
//! `<prefix>/<route>/<adapter>/<app_label>/<model_name>/<pk>/[<field>/]`

use std::fmt;

use fedit_core::ObjectKey;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("path {path} is not under {prefix}")]
    OutsidePrefix { path: String, prefix: String },

    #[error("unknown route {0}")]
    UnknownRoute(String),

    #[error("malformed adapter path {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Edit,
    Refetch,
    BlockMove,
    BlockAdd,
}

impl Route {
    pub fn segment(self) -> &'static str {
        match self {
            Route::Edit => "edit",
            Route::Refetch => "refetch",
            Route::BlockMove => "block-move",
            Route::BlockAdd => "block-add",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "edit" => Some(Route::Edit),
            "refetch" => Some(Route::Refetch),
            "block-move" => Some(Route::BlockMove),
            "block-add" => Some(Route::BlockAdd),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// A parsed or to-be-built endpoint path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterPath {
    pub route: Route,
    pub adapter: String,
    pub app_label: String,
    pub model_name: String,
    pub pk: String,
    pub field_name: Option<String>,
}

impl AdapterPath {
    pub fn new(route: Route, adapter: impl Into<String>, key: &ObjectKey, field_name: Option<&str>) -> Self {
        Self {
            route,
            adapter: adapter.into(),
            app_label: key.app_label.clone(),
            model_name: key.model_name.clone(),
            pk: key.pk.clone(),
            field_name: field_name.filter(|f| !f.is_empty()).map(String::from),
        }
    }

    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::new(self.app_label.clone(), self.model_name.clone(), &self.pk)
    }

    /// Same target, another route.
    #[must_use]
    pub fn with_route(&self, route: Route) -> Self {
        Self {
            route,
            ..self.clone()
        }
    }

    pub fn to_url(&self, prefix: &str) -> String {
        let mut url = format!(
            "{}/{}/{}/{}/{}/{}/",
            prefix, self.route, self.adapter, self.app_label, self.model_name, self.pk
        );
        if let Some(field) = &self.field_name {
            url.push_str(field);
            url.push('/');
        }
        url
    }

    /// URL with query parameters; empty values are left out.
    pub fn to_url_with_query(&self, prefix: &str, params: &[(&str, &str)]) -> String {
        let url = self.to_url(prefix);
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (name, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
            query.append_pair(name, value);
            any = true;
        }
        if any {
            format!("{}?{}", url, query.finish())
        } else {
            url
        }
    }

    pub fn parse(prefix: &str, path: &str) -> Result<Self, RouteError> {
        let rest = path
            .strip_prefix(prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| RouteError::OutsidePrefix {
                path: path.to_string(),
                prefix: prefix.to_string(),
            })?;

        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let (route, segments) = segments
            .split_first()
            .ok_or_else(|| RouteError::Malformed(path.to_string()))?;
        let route = Route::from_segment(route).ok_or_else(|| RouteError::UnknownRoute(route.to_string()))?;

        match *segments {
            [adapter, app_label, model_name, pk] => Ok(Self::from_parts(route, adapter, app_label, model_name, pk, None)),
            [adapter, app_label, model_name, pk, field] => Ok(Self::from_parts(
                route,
                adapter,
                app_label,
                model_name,
                pk,
                Some(field),
            )),
            _ => Err(RouteError::Malformed(path.to_string())),
        }
    }

    fn from_parts(
        route: Route,
        adapter: &str,
        app_label: &str,
        model_name: &str,
        pk: &str,
        field_name: Option<&str>,
    ) -> Self {
        Self {
            route,
            adapter: adapter.to_string(),
            app_label: app_label.to_string(),
            model_name: model_name.to_string(),
            pk: pk.to_string(),
            field_name: field_name.map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_parse() {
        let key = ObjectKey::new("pages", "page", 3);
        let path = AdapterPath::new(Route::Edit, "block", &key, Some("body"));
        let url = path.to_url("/fedit");
        assert_eq!(url, "/fedit/edit/block/pages/page/3/body/");
        assert_eq!(AdapterPath::parse("/fedit", &url).unwrap(), path);

        let model = AdapterPath::new(Route::Refetch, "model", &key, None);
        assert_eq!(model.to_url("/fedit"), "/fedit/refetch/model/pages/page/3/");
        assert_eq!(AdapterPath::parse("/fedit", "/fedit/refetch/model/pages/page/3").unwrap(), model);
        assert_eq!(model.object_key(), key);
    }

    #[test]
    fn query_parameters_are_encoded() {
        let key = ObjectKey::new("pages", "page", 3);
        let path = AdapterPath::new(Route::BlockMove, "block", &key, Some("body"));
        assert_eq!(
            path.to_url_with_query("", &[("shared_context", "a+b:c"), ("action", "up"), ("empty", "")]),
            "/block-move/block/pages/page/3/body/?shared_context=a%2Bb%3Ac&action=up"
        );
        assert_eq!(path.to_url_with_query("", &[]), "/block-move/block/pages/page/3/body/");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            AdapterPath::parse("/fedit", "/other/edit/a/b/c/1/"),
            Err(RouteError::OutsidePrefix { .. })
        ));
        assert!(matches!(
            AdapterPath::parse("/fedit", "/feditx/edit/a/b/c/1/"),
            Err(RouteError::OutsidePrefix { .. })
        ));
        assert_eq!(
            AdapterPath::parse("/fedit", "/fedit/delete/a/b/c/1/"),
            Err(RouteError::UnknownRoute("delete".into()))
        );
        assert!(matches!(
            AdapterPath::parse("/fedit", "/fedit/edit/a/b/"),
            Err(RouteError::Malformed(_))
        ));
    }
}
