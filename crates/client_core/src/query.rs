use url::form_urlencoded;

/// OData system query options, rendered into the parameter string the
/// controllers pass to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    filter: Option<String>,
    select: Vec<String>,
    expand: Vec<String>,
    order_by: Option<String>,
    top: Option<u32>,
    skip: Option<u32>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn expand(mut self, navigation: impl Into<String>) -> Self {
        self.expand.push(navigation.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(filter) = &self.filter {
            serializer.append_pair("$filter", filter);
        }
        if !self.select.is_empty() {
            serializer.append_pair("$select", &self.select.join(","));
        }
        if !self.expand.is_empty() {
            serializer.append_pair("$expand", &self.expand.join(","));
        }
        if let Some(order_by) = &self.order_by {
            serializer.append_pair("$orderby", order_by);
        }
        if let Some(top) = self.top {
            serializer.append_pair("$top", &top.to_string());
        }
        if let Some(skip) = self.skip {
            serializer.append_pair("$skip", &skip.to_string());
        }
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_parameters_render_empty_string() {
        assert_eq!(QueryParameters::new().to_query_string(), "");
    }

    #[test]
    fn renders_options_in_stable_order() {
        let query = QueryParameters::new()
            .top(5)
            .select(["ID", "Name"])
            .filter("Name eq 'Acme'")
            .expand("SalesInvoiceLines");
        assert_eq!(
            query.to_query_string(),
            "%24filter=Name+eq+%27Acme%27&%24select=ID%2CName&%24expand=SalesInvoiceLines&%24top=5"
        );
    }
}
