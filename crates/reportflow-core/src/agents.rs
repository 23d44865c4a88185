use std::fmt::Write as _;

/// Role-bound persona handed to the completion provider as the system prompt.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub id: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl AgentSpec {
    pub fn system_prompt(&self, topic: &str) -> String {
        format!(
            "You are a {}. {}.\nYour goal: {}",
            self.role,
            self.backstory,
            interpolate_topic(self.goal, topic)
        )
    }
}

/// Unit of work assigned to an agent. Upstream context blocks are appended
/// to the rendered prompt in the order they are supplied.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub description: &'static str,
    pub expected_output: &'static str,
}

impl TaskSpec {
    pub fn user_prompt(&self, topic: &str, context: &[(&str, &str)]) -> String {
        let mut prompt = interpolate_topic(self.description, topic);
        for (label, body) in context {
            let _ = write!(prompt, "\n\n{label}:\n{body}");
        }
        let _ = write!(prompt, "\n\nExpected output: {}", self.expected_output);
        prompt
    }
}

pub const RESEARCHER: AgentSpec = AgentSpec {
    id: "research",
    role: "Research Analyst",
    goal: "Gather comprehensive information on {topic}",
    backstory: "Expert researcher with deep analytical skills and attention to detail",
};

pub const ANALYST: AgentSpec = AgentSpec {
    id: "analysis",
    role: "Data Analyst",
    goal: "Analyze research findings and extract key insights",
    backstory: "Experienced analyst skilled at identifying patterns and drawing conclusions",
};

pub const WRITER: AgentSpec = AgentSpec {
    id: "report",
    role: "Report Writer",
    goal: "Compile findings into a structured, professional report",
    backstory: "Technical writer who creates clear, actionable reports",
};

pub const RESEARCH_TASK: TaskSpec = TaskSpec {
    description: "Research {topic} thoroughly. Gather key facts, statistics, and recent developments.",
    expected_output: "Comprehensive research notes with sources and key findings",
};

pub const ANALYSIS_TASK: TaskSpec = TaskSpec {
    description: "Analyze the research findings. Identify trends, implications, and recommendations.",
    expected_output: "Analysis with key insights and actionable recommendations",
};

pub const REPORT_TASK: TaskSpec = TaskSpec {
    description: "Create a structured report combining research and analysis.",
    expected_output: "Professional report with executive summary, findings, and recommendations",
};

pub fn interpolate_topic(template: &str, topic: &str) -> String {
    template.replace("{topic}", topic)
}
