/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

//! Problems collected while binding settings against a store.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The value was ignored or substituted; loading continues.
    Warning,
    /// Loading cannot produce a usable settings graph.
    Error,
}

/// A single issue found while binding a settings graph, tied to the
/// store key it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub severity: Severity,
    pub key: String,
    pub message: String,
}

impl Problem {
    pub fn warning(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Sink for problems found during a load. The default implementation
/// collects them; callers inspect the list after loading.
pub trait ProblemReporter {
    fn report(&mut self, problem: Problem);
}

#[derive(Debug, Default)]
pub struct DefaultProblemReporter {
    problems: Vec<Problem>,
}

impl DefaultProblemReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn has_errors(&self) -> bool {
        self.problems
            .iter()
            .any(|p| p.severity == Severity::Error)
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }
}

impl ProblemReporter for DefaultProblemReporter {
    fn report(&mut self, problem: Problem) {
        self.problems.push(problem);
    }
}
