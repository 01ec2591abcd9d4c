/// A request the binding benchmarks replay against an adapter.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    pub fn small(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Small, request)
    }

    pub fn normal(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Normal, request)
    }

    pub fn large(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Large, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

/// The parts of a request that vary between cases.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    uri: &'static str,
    content_type: Option<&'static str>,
    body: &'static [u8],
}

impl TestRequest {
    pub const fn new(uri: &'static str, content_type: Option<&'static str>, body: &'static [u8]) -> Self {
        Self { uri, content_type, body }
    }

    pub const fn get(uri: &'static str) -> Self {
        Self::new(uri, None, b"")
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn body(&self) -> &'static [u8] {
        self.body
    }
}

/// The payload size class of a case, used as the benchmark group name.
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    pub fn name(self) -> &'static str {
        match self {
            TestGroup::Small => "small",
            TestGroup::Normal => "normal",
            TestGroup::Large => "large",
        }
    }
}
